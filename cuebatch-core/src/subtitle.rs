// ============================================================================
// cuebatch-core/src/subtitle.rs
// ============================================================================
//
// SUBTITLE RETIMING: ASS -> SRT -> Timing Pipeline -> ASS Round Trip
//
// A styled ASS track is converted to SRT with ffmpeg, its cues are run through
// the timing pipeline, and the corrected SRT is converted back to ASS. The
// regenerated ASS loses its styling header, so the header is rewritten from a
// fixed template that points the editor at the matching video file.
//
// Intermediate SRT files are always removed, whether the job succeeds or not.
//
// KEY COMPONENTS:
// - SubtitlePaths: Input, output and intermediate file locations for one track
// - RetimeOptions: Whether to regenerate the ASS output
// - retime_subtitle: The full round trip for one track
// - rewrite_ass_header: Header replacement for regenerated ASS files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::external::{CommandInvoker, CommandSpec};
use crate::timeline::{TimelinePipeline, parse_srt, write_srt};

/// Suffix removed from ASS base names when deriving related file names.
pub const ORIGINAL_SUFFIX: &str = "-original";

/// Directory of the video files, relative to the subtitle directory.
pub const DEFAULT_VIDEO_DIR_REF: &str = "../dist";

const SCRIPT_HEADER_TEMPLATE: &str = "[Script Info]
; Script generated by Aegisub 3.2.2
; http://www.aegisub.org/
WrapStyle: 0
ScaledBorderAndShadow: yes
ScriptType: v4.00+
YCbCr Matrix: TV.601
PlayResX: 1920
PlayResY: 1080

[Aegisub Project Garbage]
Last Style Storage: Default
Audio File: {video}
Video File: {video}
Video AR Mode: 4
Video AR Value: 1.777778
Video Zoom Percent: 0.500000

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Noto Sans TC Bold,64,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,1.2,0,1,1.1,1.2,2,10,10,64,1";

// ============================================================================
// PATHS
// ============================================================================

/// Returns the file stem of `name` with a trailing `suffix` removed.
///
/// ```rust
/// use cuebatch_core::subtitle::file_stem_without;
///
/// assert_eq!(file_stem_without("ep01-original.ass", "-original"), "ep01");
/// assert_eq!(file_stem_without("ep01.ass", "-original"), "ep01");
/// ```
#[must_use]
pub fn file_stem_without(name: &str, suffix: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    stem.strip_suffix(suffix).unwrap_or(stem).to_string()
}

/// File locations used while retiming one ASS track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitlePaths {
    pub ass_input: PathBuf,
    pub ass_output: PathBuf,
    pub srt_input: PathBuf,
    pub srt_output: PathBuf,
    /// Value written to `Audio File` and `Video File` in the rewritten header
    pub video_ref: String,
}

impl SubtitlePaths {
    /// Derives every path from the ASS file name.
    ///
    /// The base name is the file stem with `-original` removed. Intermediates
    /// are `<base>_in.srt` and `<base>_out.srt`; the output defaults to
    /// `<base>.ass` and the video reference to `../dist/<base>.mp4`.
    pub fn new(dir: &Path, ass_file: &str, output_file: Option<&str>) -> Self {
        let base = file_stem_without(ass_file, ORIGINAL_SUFFIX);
        let output_name = output_file.map_or_else(|| format!("{base}.ass"), str::to_string);
        Self {
            ass_input: dir.join(ass_file),
            ass_output: dir.join(output_name),
            srt_input: dir.join(format!("{base}_in.srt")),
            srt_output: dir.join(format!("{base}_out.srt")),
            video_ref: format!("{DEFAULT_VIDEO_DIR_REF}/{base}.mp4"),
        }
    }

    pub fn with_video_ref(mut self, video_ref: impl Into<String>) -> Self {
        self.video_ref = video_ref.into();
        self
    }
}

// ============================================================================
// RETIMING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetimeOptions {
    /// Convert the corrected SRT back to ASS and rewrite its header
    pub write_ass: bool,
}

impl Default for RetimeOptions {
    fn default() -> Self {
        Self { write_ass: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleOutcome {
    /// The input ASS file does not exist; nothing was done
    Skipped,
    /// The track was retimed; `cues` is the number of cues written
    Retimed { cues: usize },
}

/// Retimes one ASS track.
///
/// # Arguments
///
/// * `invoker` - Runs the ffmpeg conversions
/// * `paths` - Input, output and intermediate locations
/// * `pipeline` - Timing corrections applied to the cues
/// * `options` - Whether to regenerate the ASS output
///
/// # Returns
///
/// * `SubtitleOutcome::Skipped` when the input is missing
/// * `SubtitleOutcome::Retimed` with the cue count otherwise
///
/// # Errors
///
/// * `CoreError::Conversion` if an ffmpeg conversion exits abnormally
/// * `CoreError::MalformedCue` if the intermediate SRT cannot be parsed
/// * `CoreError::Io` for file system failures
pub async fn retime_subtitle(
    invoker: &dyn CommandInvoker,
    paths: &SubtitlePaths,
    pipeline: &TimelinePipeline,
    options: RetimeOptions,
) -> CoreResult<SubtitleOutcome> {
    if !tokio::fs::try_exists(&paths.ass_input).await? {
        debug!("Subtitle {} not found, skipping", paths.ass_input.display());
        return Ok(SubtitleOutcome::Skipped);
    }

    remove_if_exists(&paths.srt_input).await?;
    remove_if_exists(&paths.srt_output).await?;

    let result = convert_and_retime(invoker, paths, pipeline, options).await;

    let cleanup_in = remove_if_exists(&paths.srt_input).await;
    let cleanup_out = remove_if_exists(&paths.srt_output).await;
    let cues = result?;
    cleanup_in?;
    cleanup_out?;

    if options.write_ass {
        let content = tokio::fs::read_to_string(&paths.ass_output).await?;
        tokio::fs::write(&paths.ass_output, rewrite_ass_header(&content, &paths.video_ref))
            .await?;
    }

    info!(
        "Retimed {} cue(s) in {}",
        cues,
        paths.ass_input.display()
    );
    Ok(SubtitleOutcome::Retimed { cues })
}

async fn convert_and_retime(
    invoker: &dyn CommandInvoker,
    paths: &SubtitlePaths,
    pipeline: &TimelinePipeline,
    options: RetimeOptions,
) -> CoreResult<usize> {
    let to_srt = CommandSpec::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(path_arg(&paths.ass_input))
        .args(["-c:s", "text"])
        .arg(path_arg(&paths.srt_input));
    run_conversion(invoker, &to_srt, "ASS to SRT").await?;

    let source = tokio::fs::read_to_string(&paths.srt_input).await?;
    let cues = pipeline.apply(parse_srt(&source)?);
    let count = cues.len();
    tokio::fs::write(&paths.srt_output, write_srt(&cues)).await?;

    if options.write_ass {
        remove_if_exists(&paths.ass_output).await?;
        let to_ass = CommandSpec::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(path_arg(&paths.srt_output))
            .arg(path_arg(&paths.ass_output));
        run_conversion(invoker, &to_ass, "SRT to ASS").await?;
    }

    Ok(count)
}

async fn run_conversion(
    invoker: &dyn CommandInvoker,
    command: &CommandSpec,
    step: &str,
) -> CoreResult<()> {
    let outcome = invoker.invoke(command).await;
    if outcome.success {
        Ok(())
    } else {
        Err(CoreError::Conversion {
            step: step.to_string(),
            diagnostics: outcome.diagnostics,
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn remove_if_exists(path: &Path) -> CoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// ASS HEADER
// ============================================================================

/// Replaces everything before the `[Events]` section with the fixed script
/// header. `[Events]` must follow a blank line; otherwise `content` is
/// returned unchanged.
#[must_use]
pub fn rewrite_ass_header(content: &str, video_ref: &str) -> String {
    let boundary = ["\r\n\r\n[Events]", "\n\n[Events]", "\n\r\n[Events]", "\r\n\n[Events]"]
        .iter()
        .filter_map(|marker| content.find(marker))
        .min();

    match boundary {
        Some(idx) if idx > 0 => {
            let header = SCRIPT_HEADER_TEMPLATE.replace("{video}", video_ref);
            format!("{header}{}", &content[idx..])
        }
        _ => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::testing::RecordingInvoker;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const CONVERTED_SRT: &str = "1\n00:00:00,100 --> 00:00:01,000\nHello\n\n\
                                 2\n00:00:01,300 --> 00:00:02,000\nWorld\n\n";

    const REGENERATED_ASS: &str = "[Script Info]\nTitle: generated\n\n\
                                   [Events]\nFormat: Layer, Start, End, Text\n";

    /// Fakes ffmpeg by writing a fixed document to the command's last argument.
    fn fake_ffmpeg() -> RecordingInvoker {
        RecordingInvoker::new().on_invoke(|command| {
            let Some(target) = command.args.last() else {
                return;
            };
            let body = if target.ends_with(".srt") {
                CONVERTED_SRT
            } else {
                REGENERATED_ASS
            };
            fs::write(target, body).unwrap();
        })
    }

    #[test]
    fn test_paths_strip_original_suffix() {
        let paths = SubtitlePaths::new(Path::new("dist-ass"), "ep01-original.ass", None);
        assert_eq!(paths.ass_input, Path::new("dist-ass/ep01-original.ass"));
        assert_eq!(paths.ass_output, Path::new("dist-ass/ep01.ass"));
        assert_eq!(paths.srt_input, Path::new("dist-ass/ep01_in.srt"));
        assert_eq!(paths.srt_output, Path::new("dist-ass/ep01_out.srt"));
        assert_eq!(paths.video_ref, "../dist/ep01.mp4");
    }

    #[test]
    fn test_paths_explicit_output() {
        let paths = SubtitlePaths::new(Path::new("subs"), "ep02.ass", Some("ep02-fixed.ass"))
            .with_video_ref("/media/ep02.mkv");
        assert_eq!(paths.ass_output, Path::new("subs/ep02-fixed.ass"));
        assert_eq!(paths.video_ref, "/media/ep02.mkv");
    }

    #[test]
    fn test_rewrite_header_keeps_events() {
        let content = "[Script Info]\nTitle: x\n\n[V4+ Styles]\nStyle: a\n\n[Events]\nDialogue: 0\n";
        let rewritten = rewrite_ass_header(content, "../dist/ep01.mp4");
        assert!(rewritten.starts_with("[Script Info]\n; Script generated by Aegisub 3.2.2"));
        assert!(rewritten.contains("Audio File: ../dist/ep01.mp4\nVideo File: ../dist/ep01.mp4"));
        assert!(rewritten.ends_with("Encoding\nStyle: Default,Noto Sans TC Bold,64,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,1.2,0,1,1.1,1.2,2,10,10,64,1\n\n[Events]\nDialogue: 0\n"));
        assert!(!rewritten.contains("Title: x"));
    }

    #[test]
    fn test_rewrite_header_crlf() {
        let content = "[Script Info]\r\nTitle: x\r\n\r\n[Events]\r\nDialogue: 0\r\n";
        let rewritten = rewrite_ass_header(content, "v.mp4");
        assert!(rewritten.ends_with("\r\n\r\n[Events]\r\nDialogue: 0\r\n"));
        assert!(!rewritten.contains("Title: x"));
    }

    #[test]
    fn test_rewrite_header_without_events_is_unchanged() {
        let content = "[Script Info]\nTitle: x\n";
        assert_eq!(rewrite_ass_header(content, "v.mp4"), content);
    }

    #[tokio::test]
    async fn test_missing_input_is_skipped() {
        let dir = tempdir().unwrap();
        let invoker = RecordingInvoker::new();
        let paths = SubtitlePaths::new(dir.path(), "missing.ass", None);
        let outcome = retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SubtitleOutcome::Skipped);
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_writes_ass_and_removes_intermediates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ep01-original.ass"), "original").unwrap();
        let invoker = fake_ffmpeg();
        let paths = SubtitlePaths::new(dir.path(), "ep01-original.ass", None);

        let outcome = retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, SubtitleOutcome::Retimed { cues: 2 });
        let calls = invoker.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args[..2], ["-y".to_string(), "-i".to_string()]);
        assert!(calls[0].args.contains(&"text".to_string()));
        assert!(!paths.srt_input.exists());
        assert!(!paths.srt_output.exists());

        let ass = fs::read_to_string(&paths.ass_output).unwrap();
        assert!(ass.contains("Video File: ../dist/ep01.mp4"));
        assert!(ass.ends_with("\n\n[Events]\nFormat: Layer, Start, End, Text\n"));
        assert_eq!(
            fs::read_to_string(&paths.ass_input).unwrap(),
            "original"
        );
    }

    #[tokio::test]
    async fn test_corrected_cues_reach_back_conversion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ep01.ass"), "original").unwrap();
        let captured = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&captured);
        let invoker = RecordingInvoker::new().on_invoke(move |command| {
            let Some(target) = command.args.last() else {
                return;
            };
            if target.ends_with(".srt") {
                fs::write(target, CONVERTED_SRT).unwrap();
            } else {
                *sink.lock().unwrap() = fs::read_to_string(&command.args[2]).unwrap();
                fs::write(target, REGENERATED_ASS).unwrap();
            }
        });
        let paths = SubtitlePaths::new(dir.path(), "ep01.ass", None);

        retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions::default(),
        )
        .await
        .unwrap();

        // Shifted by -250ms, first start clamped, 300ms gap left alone
        assert_eq!(
            *captured.lock().unwrap(),
            "1\n00:00:00,000 --> 00:00:00,750\nHello\n\n\
             2\n00:00:01,050 --> 00:00:01,750\nWorld\n\n"
        );
    }

    #[tokio::test]
    async fn test_srt_only_mode_skips_back_conversion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ep01.ass"), "original").unwrap();
        let invoker = fake_ffmpeg();
        let paths = SubtitlePaths::new(dir.path(), "ep01.ass", None);

        let outcome = retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions { write_ass: false },
        )
        .await
        .unwrap();

        assert_eq!(outcome, SubtitleOutcome::Retimed { cues: 2 });
        assert_eq!(invoker.call_count(), 1);
        assert!(!paths.srt_output.exists());
        assert_eq!(fs::read_to_string(&paths.ass_input).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_failed_conversion_is_job_error_and_cleans_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ep01.ass"), "original").unwrap();
        fs::write(dir.path().join("ep01_in.srt"), "stale").unwrap();
        let invoker = RecordingInvoker::new().fail_when("-c:s", "Invalid data found");
        let paths = SubtitlePaths::new(dir.path(), "ep01.ass", None);

        let err = retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions::default(),
        )
        .await
        .unwrap_err();

        match err {
            CoreError::Conversion { step, diagnostics } => {
                assert_eq!(step, "ASS to SRT");
                assert_eq!(diagnostics, "Invalid data found");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(!paths.srt_input.exists());
        assert_eq!(invoker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_srt_aborts_job_and_cleans_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ep01.ass"), "original").unwrap();
        let invoker = RecordingInvoker::new().on_invoke(|command| {
            if let Some(target) = command.args.last() {
                fs::write(target, "1\nnot a timestamp\nHello\n").unwrap();
            }
        });
        let paths = SubtitlePaths::new(dir.path(), "ep01.ass", None);

        let err = retime_subtitle(
            &invoker,
            &paths,
            &TimelinePipeline::default(),
            RetimeOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::MalformedCue { line: 2, .. }));
        assert!(!paths.srt_input.exists());
        assert!(!paths.srt_output.exists());
    }
}
