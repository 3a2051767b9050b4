// ============================================================================
// cuebatch-core/src/timeline/mod.rs
// ============================================================================
//
// CUE TIMING PIPELINE: Ordered Timestamp Corrections for Subtitle Tracks
//
// This module holds the cue data model and the three correction stages that
// run on every subtitle track before it is handed back to ffmpeg:
//
//   Resync(offset) -> ClampNegativeStart -> GapFill(threshold)
//
// Every stage is 1:1 on cue count, never reorders cues and is a pure
// function of its input. GapFill needs one cue of look-behind, which is
// threaded through a scan as an explicit accumulator instead of being kept
// in mutable state between calls.
//
// KEY COMPONENTS:
// - Cue / Timeline: Timed text records in document order
// - Stage: One correction rule with a pure per-cue step
// - TimelinePipeline: Left-to-right composition of stages
// - srt: Reader and writer for the SubRip text format

pub mod srt;

use serde::{Deserialize, Serialize};

use crate::config::{CoreConfig, DEFAULT_GAP_THRESHOLD_MS, DEFAULT_RESYNC_OFFSET_MS};

pub use srt::{format_timestamp, parse_srt, parse_timestamp, write_srt};

/// One timed text record. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

impl Cue {
    pub fn new(start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }
}

/// Cues of one job in document order. Not necessarily sorted by start.
pub type Timeline = Vec<Cue>;

/// A single timing correction applied to every cue of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Shift start and end by `offset_ms`. No clamping; saturates at the
    /// bounds of `i64`.
    Resync { offset_ms: i64 },

    /// Raise negative starts to zero. End is left untouched.
    ClampNegativeStart,

    /// Close silences shorter than `threshold_ms` by moving the cue's start
    /// back to the previous cue's end.
    GapFill { threshold_ms: i64 },
}

impl Stage {
    /// Applies the stage to one cue given the previous cue this stage emitted.
    #[must_use]
    pub fn step(&self, prev: Option<&Cue>, mut cue: Cue) -> Cue {
        match *self {
            Stage::Resync { offset_ms } => {
                cue.start_ms = cue.start_ms.saturating_add(offset_ms);
                cue.end_ms = cue.end_ms.saturating_add(offset_ms);
            }
            Stage::ClampNegativeStart => {
                if cue.start_ms < 0 {
                    cue.start_ms = 0;
                }
            }
            Stage::GapFill { threshold_ms } => {
                if let Some(prev) = prev {
                    if cue.start_ms.saturating_sub(prev.end_ms) < threshold_ms {
                        cue.start_ms = prev.end_ms;
                    }
                }
            }
        }
        cue
    }

    /// Runs the stage over a whole timeline in input order.
    ///
    /// The previous output cue is the scan accumulator; the first cue has no
    /// predecessor.
    #[must_use]
    pub fn apply(&self, cues: Timeline) -> Timeline {
        cues.into_iter()
            .scan(None::<Cue>, |prev, cue| {
                let out = self.step(prev.as_ref(), cue);
                *prev = Some(out.clone());
                Some(out)
            })
            .collect()
    }
}

/// Ordered composition of stages, applied left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePipeline {
    stages: Vec<Stage>,
}

impl TimelinePipeline {
    /// Creates a pipeline from an explicit stage list.
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// `Resync(offset) -> ClampNegativeStart -> GapFill(threshold)`.
    pub fn standard(offset_ms: i64, threshold_ms: i64) -> Self {
        Self::new(vec![
            Stage::Resync { offset_ms },
            Stage::ClampNegativeStart,
            Stage::GapFill { threshold_ms },
        ])
    }

    /// Standard pipeline using the configured offset and threshold.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::standard(config.resync_offset_ms, config.gap_threshold_ms)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Applies every stage in order. Output length always equals input length.
    #[must_use]
    pub fn apply(&self, cues: Timeline) -> Timeline {
        self.stages
            .iter()
            .fold(cues, |timeline, stage| stage.apply(timeline))
    }
}

impl Default for TimelinePipeline {
    fn default() -> Self {
        Self::standard(DEFAULT_RESYNC_OFFSET_MS, DEFAULT_GAP_THRESHOLD_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start_ms: i64, end_ms: i64) -> Cue {
        Cue::new(start_ms, end_ms, format!("{start_ms}-{end_ms}"))
    }

    fn times(cues: &[Cue]) -> Vec<(i64, i64)> {
        cues.iter().map(|c| (c.start_ms, c.end_ms)).collect()
    }

    #[test]
    fn test_clamp_then_gap_fill_snaps_short_gap() {
        let pipeline = TimelinePipeline::standard(0, 250);
        let out = pipeline.apply(vec![cue(-100, 200), cue(210, 400)]);
        assert_eq!(times(&out), vec![(0, 200), (200, 400)]);
    }

    #[test]
    fn test_gap_fill_leaves_wide_gap() {
        let stage = Stage::GapFill { threshold_ms: 250 };
        let out = stage.apply(vec![cue(500, 700), cue(1200, 1400)]);
        assert_eq!(times(&out), vec![(500, 700), (1200, 1400)]);
    }

    #[test]
    fn test_gap_fill_gap_equal_to_threshold_is_kept() {
        let stage = Stage::GapFill { threshold_ms: 250 };
        let out = stage.apply(vec![cue(0, 100), cue(350, 500)]);
        assert_eq!(out[1].start_ms, 350);
    }

    #[test]
    fn test_gap_fill_closes_overlap() {
        let stage = Stage::GapFill { threshold_ms: 250 };
        let out = stage.apply(vec![cue(0, 500), cue(400, 900)]);
        assert_eq!(out[1].start_ms, 500);
    }

    #[test]
    fn test_gap_fill_first_cue_unchanged() {
        let stage = Stage::GapFill { threshold_ms: 250 };
        let out = stage.apply(vec![cue(10, 20)]);
        assert_eq!(times(&out), vec![(10, 20)]);
    }

    #[test]
    fn test_gap_fill_only_looks_at_immediate_predecessor() {
        let stage = Stage::GapFill { threshold_ms: 250 };
        let out = stage.apply(vec![cue(0, 100), cue(200, 300), cue(2000, 2100), cue(2150, 2200)]);
        assert_eq!(
            times(&out),
            vec![(0, 100), (100, 300), (2000, 2100), (2100, 2200)]
        );
    }

    #[test]
    fn test_clamp_leaves_end_untouched() {
        let out = Stage::ClampNegativeStart.apply(vec![cue(-300, -50), cue(-10, 40)]);
        assert_eq!(times(&out), vec![(0, -50), (0, 40)]);
    }

    #[test]
    fn test_resync_inverse_is_identity() {
        let original = vec![cue(-40, 10), cue(0, 250), cue(1000, 900), cue(5000, 6000)];
        for offset in [-250, 0, 1, 733, -10_000] {
            let shifted = Stage::Resync { offset_ms: offset }.apply(original.clone());
            let restored = Stage::Resync { offset_ms: -offset }.apply(shifted);
            assert_eq!(restored, original);
        }
    }

    #[test]
    fn test_resync_saturates_on_extreme_offsets() {
        let input = vec![cue(-5, 10), cue(100, 200)];
        let late = Stage::Resync { offset_ms: i64::MAX }.apply(input.clone());
        assert_eq!(times(&late), vec![(i64::MAX - 5, i64::MAX), (i64::MAX, i64::MAX)]);

        let early = Stage::Resync { offset_ms: i64::MIN }.apply(input);
        assert_eq!(times(&early), vec![(i64::MIN, i64::MIN + 10), (i64::MIN + 100, i64::MIN + 200)]);

        let out = TimelinePipeline::standard(i64::MIN, 250).apply(early);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.start_ms <= 0));
    }

    #[test]
    fn test_pipeline_is_one_to_one_and_keeps_payloads() {
        let input = vec![cue(0, 100), cue(90, 120), cue(130, 400), cue(2000, 2500)];
        let out = TimelinePipeline::default().apply(input.clone());
        assert_eq!(out.len(), input.len());
        let texts: Vec<_> = out.iter().map(|c| c.text.as_str()).collect();
        let expected: Vec<_> = input.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_default_pipeline_invariants() {
        let input = vec![
            cue(100, 900),
            cue(1000, 1800),
            cue(1900, 2600),
            cue(4000, 4200),
            cue(4300, 5000),
        ];
        let out = TimelinePipeline::default().apply(input);
        assert!(out.iter().all(|c| c.start_ms >= 0));
        for pair in out.windows(2) {
            let gap = pair[1].start_ms - pair[0].end_ms;
            assert!(gap >= 250 || gap == 0, "gap {gap} violates invariant");
        }
    }

    // Small xorshift generator so the timelines below are reproducible.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self, bound: i64) -> i64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 % bound as u64) as i64
        }
    }

    fn generated_timelines() -> Vec<Timeline> {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let mut timelines = Vec::new();
        for round in 0..40 {
            let len = 1 + rng.next(12) as usize;
            let mut cursor = rng.next(600) - 300;
            let mut cues = Vec::with_capacity(len);
            for _ in 0..len {
                // Steps may be negative, producing overlaps and out-of-order cues.
                cursor += rng.next(900) - 200;
                let duration = rng.next(700);
                cues.push(cue(cursor, cursor + duration));
            }
            if round % 3 == 0 {
                // Shuffle so document order differs from time order.
                for i in (1..cues.len()).rev() {
                    let j = rng.next(i as i64 + 1) as usize;
                    cues.swap(i, j);
                }
            }
            timelines.push(cues);
        }
        timelines
    }

    fn assert_gaps_closed_or_wide(cues: &[Cue], threshold_ms: i64) {
        for pair in cues.windows(2) {
            let gap = pair[1].start_ms - pair[0].end_ms;
            assert!(
                gap >= threshold_ms || gap == 0,
                "gap {gap} between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_stage_invariants_over_generated_timelines() {
        for input in generated_timelines() {
            for offset_ms in [-250, -1_000, 0, 400] {
                for threshold_ms in [0, 1, 250, 1_000] {
                    let resynced = Stage::Resync { offset_ms }.apply(input.clone());
                    assert_eq!(resynced.len(), input.len());

                    let clamped = Stage::ClampNegativeStart.apply(resynced.clone());
                    assert_eq!(clamped.len(), input.len());
                    for (before, after) in resynced.iter().zip(&clamped) {
                        assert_eq!(after.start_ms, before.start_ms.max(0));
                        assert_eq!(after.end_ms, before.end_ms);
                    }

                    let filled = Stage::GapFill { threshold_ms }.apply(clamped.clone());
                    assert_eq!(filled.len(), input.len());
                    assert_gaps_closed_or_wide(&filled, threshold_ms);

                    let out = TimelinePipeline::standard(offset_ms, threshold_ms).apply(input.clone());
                    assert_eq!(out, filled);
                    // A snapped start takes the predecessor's end, which
                    // clamping leaves negative when the whole cue was.
                    for (idx, c) in out.iter().enumerate() {
                        if idx == 0 || out[idx - 1].end_ms >= 0 {
                            assert!(c.start_ms >= 0, "negative start in {c:?}");
                        }
                    }
                    let texts: Vec<_> = out.iter().map(|c| c.text.as_str()).collect();
                    let expected: Vec<_> = input.iter().map(|c| c.text.as_str()).collect();
                    assert_eq!(texts, expected);
                }
            }
        }
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let input = vec![cue(-20, 300), cue(310, 700), cue(1200, 1300)];
        let pipeline = TimelinePipeline::default();
        assert_eq!(pipeline.apply(input.clone()), pipeline.apply(input));
    }

    #[test]
    fn test_empty_timeline() {
        assert!(TimelinePipeline::default().apply(Vec::new()).is_empty());
    }
}
