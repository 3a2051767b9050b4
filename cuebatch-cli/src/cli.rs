// cuebatch-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use cuebatch_core::config::{
    DEFAULT_GAP_THRESHOLD_MS, DEFAULT_INPUT_DIR, DEFAULT_MAX_CONCURRENT, DEFAULT_PATTERN,
    DEFAULT_RESYNC_OFFSET_MS,
};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "cuebatch: bounded-concurrency media batch runner",
    long_about = "Runs one job per matching file in a directory with a cap on concurrently \
                  running jobs, and retimes subtitle tracks via ffmpeg."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs an external command for every matching file
    Run(RunArgs),
    /// Retimes every matching ASS subtitle track (ASS -> SRT -> ASS via ffmpeg)
    Retime(RetimeArgs),
    /// Applies the cue timing pipeline to a single SRT file, no external tools
    Shift(ShiftArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory scanned for job files (top level only)
    #[arg(long, global = true, value_name = "DIR", env = "CUEBATCH_DIR", default_value = DEFAULT_INPUT_DIR)]
    pub dir: PathBuf,

    /// Regular expression selecting files; matched as ^PATTERN\.EXT$
    #[arg(short = 'p', long, global = true, value_name = "REGEX", env = "CUEBATCH_PATTERN", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Maximum number of jobs running at the same time
    #[arg(short = 'j', long, global = true, value_name = "N", env = "CUEBATCH_MAX_CONCURRENT", default_value_t = DEFAULT_MAX_CONCURRENT)]
    pub jobs: usize,

    /// Resync offset applied to every cue, in milliseconds (negative = earlier)
    #[arg(long, global = true, value_name = "MS", env = "CUEBATCH_OFFSET_MS", default_value_t = DEFAULT_RESYNC_OFFSET_MS, allow_hyphen_values = true)]
    pub offset: i64,

    /// Gaps between cues shorter than this are closed, in milliseconds
    #[arg(long, global = true, value_name = "MS", env = "CUEBATCH_THRESHOLD_MS", default_value_t = DEFAULT_GAP_THRESHOLD_MS)]
    pub threshold: i64,

    /// Capture external tool stderr and log it
    #[arg(long, global = true, env = "CUEBATCH_DEBUG")]
    pub debug: bool,

    /// Enable debug logging and print progress as log lines instead of a bar
    #[arg(short, long, global = true, env = "CUEBATCH_VERBOSE")]
    pub verbose: bool,

    /// Print the batch summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command template; {input}, {name}, {stem} and {dir} are expanded per file
    #[arg(required = true, value_name = "TEMPLATE")]
    pub template: String,

    /// Extension of job files
    #[arg(short, long, value_name = "EXT", default_value = "mp4")]
    pub extension: String,
}

#[derive(Args, Debug)]
pub struct RetimeArgs {
    /// Extension of subtitle files
    #[arg(short, long, value_name = "EXT", default_value = "ass")]
    pub extension: String,

    /// Video directory written into rewritten ASS headers, relative to --dir
    #[arg(long, value_name = "DIR", default_value = "../dist")]
    pub video_dir: String,

    /// Extension of the matching video files
    #[arg(long, value_name = "EXT", default_value = "mp4")]
    pub video_ext: String,

    /// Keep only the corrected SRT step; do not regenerate ASS files
    #[arg(long)]
    pub no_ass: bool,

    /// Milliseconds to wait before each ffmpeg launch
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub launch_delay: u64,
}

#[derive(Args, Debug)]
pub struct ShiftArgs {
    /// SRT file to retime
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file; the result goes to stdout when omitted
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}
