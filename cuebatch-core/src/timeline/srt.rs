//! SubRip (SRT) reader and writer.
//!
//! The reader keeps cues in document order and preserves payload lines
//! exactly, so a parse/write round trip keeps cue count, order and text.
//! Timestamps are carried at millisecond precision, the finest the format
//! supports.

use crate::error::{CoreError, CoreResult};

use super::{Cue, Timeline};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Parses an SRT document into a timeline.
///
/// Index lines are optional. Either `,` or `.` is accepted before the
/// milliseconds. Blank-line runs between records are ignored.
///
/// # Errors
///
/// Returns `CoreError::MalformedCue` with the 1-based line number when a
/// record has no `-->` separator, a timestamp cannot be parsed, or a cue ends
/// before it starts.
pub fn parse_srt(input: &str) -> CoreResult<Timeline> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut cues = Vec::new();
    let mut lines = input
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .peekable();

    while let Some((line_no, line)) = lines.next() {
        let first = line.trim();
        if first.is_empty() {
            continue;
        }

        // The index line may be missing; in that case the first line is the
        // timestamp line itself.
        let (times_no, times) = if first.contains("-->") {
            (line_no, first)
        } else {
            match lines.next() {
                Some((no, next)) => (no, next.trim()),
                None => {
                    return Err(malformed(line_no, "cue is missing a timestamp line"));
                }
            }
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .ok_or_else(|| malformed(times_no, "timestamp line must contain '-->'"))?;

        // Position settings may follow the end timestamp.
        let end_raw = end_raw.split_whitespace().next().unwrap_or("");

        let start_ms = parse_timestamp(start_raw).ok_or_else(|| {
            malformed(times_no, &format!("invalid start timestamp '{start_raw}'"))
        })?;
        let end_ms = parse_timestamp(end_raw)
            .ok_or_else(|| malformed(times_no, &format!("invalid end timestamp '{end_raw}'")))?;

        if end_ms < start_ms {
            return Err(malformed(
                times_no,
                &format!("cue ends before it starts: {start_raw} --> {end_raw}"),
            ));
        }

        let mut text_lines = Vec::new();
        while let Some((_, next)) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(*next);
            lines.next();
        }

        cues.push(Cue {
            start_ms,
            end_ms,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

/// Serialises cues as SRT, numbering them from 1.
pub fn write_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (idx, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_timestamp(cue.start_ms),
            format_timestamp(cue.end_ms),
            cue.text
        ));
    }
    out
}

/// Parses `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`) into milliseconds.
///
/// Fractions shorter than three digits are right-padded, longer ones are
/// truncated to milliseconds.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let cleaned = value.trim().replace(',', ".");
    let (time_part, fraction) = match cleaned.split_once('.') {
        Some((time, fraction)) => (time, fraction),
        None => (cleaned.as_str(), "0"),
    };

    let mut hms = time_part.split(':');
    let hours = parse_component(hms.next()?)?;
    let minutes = parse_component(hms.next()?)?;
    let seconds = parse_component(hms.next()?)?;
    if hms.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis: i64 = format!("{fraction:0<3}")[..3].parse().ok()?;

    hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis)
}

/// Formats milliseconds as `HH:MM:SS,mmm`. Negative values render as zero.
#[must_use]
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

fn parse_component(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn malformed(line: usize, reason: &str) -> CoreError {
    CoreError::MalformedCue {
        line,
        reason: reason.to_string(),
    }
}
