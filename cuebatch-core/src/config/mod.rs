//! Configuration structures and constants for the cuebatch-core library.
//!
//! This module provides the configuration consumed by the batch runner, the
//! external command invoker and the cue timing pipeline. Runtime switches such
//! as the debug mode and the filter pattern are fields here and are passed
//! explicitly at construction; the library never reads process arguments.

mod builder;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use builder::CoreConfigBuilder;

// Default constants

/// Default number of jobs allowed to run at the same time.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Default resync offset applied to every cue, in milliseconds.
/// Negative values move subtitles earlier.
pub const DEFAULT_RESYNC_OFFSET_MS: i64 = -250;

/// Default gap-fill threshold in milliseconds. Silences between adjacent
/// cues shorter than this are closed.
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 250;

/// Default filter pattern, matches every file name.
pub const DEFAULT_PATTERN: &str = ".*";

/// Default extension of candidate job files.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Default directory scanned for candidate job files.
pub const DEFAULT_INPUT_DIR: &str = "dist";

/// Main configuration structure for the cuebatch-core library.
///
/// All fields have defaults, so a consumer usually only overrides the few
/// values it cares about, either directly or through [`CoreConfigBuilder`].
///
/// # Examples
///
/// ```rust
/// use cuebatch_core::config::CoreConfigBuilder;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir("dist")
///     .pattern("episode-0[1-3]")
///     .max_concurrent(4)
///     .build();
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory listed for candidate job files
    pub input_dir: PathBuf,

    /// Extension (without the dot) a candidate must carry
    pub extension: String,

    /// Regular expression matched against the file name without extension,
    /// anchored at both ends
    pub pattern: String,

    /// Upper bound on concurrently running jobs
    pub max_concurrent: usize,

    /// Offset applied by the resync stage, in milliseconds
    pub resync_offset_ms: i64,

    /// Threshold used by the gap-fill stage, in milliseconds
    pub gap_threshold_ms: i64,

    /// Capture stderr of external commands and forward it to the log.
    /// When false, stderr is discarded.
    pub log_stderr: bool,

    /// Delay before each external command is spawned, in milliseconds
    pub launch_delay_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            pattern: DEFAULT_PATTERN.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            resync_offset_ms: DEFAULT_RESYNC_OFFSET_MS,
            gap_threshold_ms: DEFAULT_GAP_THRESHOLD_MS,
            log_stderr: false,
            launch_delay_ms: 0,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration with default values scanning `input_dir`.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    /// Checks the configuration for values the core cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` for a zero concurrency cap, a non-positive
    /// gap threshold or an empty extension, and `CoreError::InvalidPattern`
    /// if the filter pattern does not compile.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_concurrent == 0 {
            return Err(CoreError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        if self.gap_threshold_ms <= 0 {
            return Err(CoreError::Config(format!(
                "gap_threshold_ms must be positive, got {}",
                self.gap_threshold_ms
            )));
        }

        if self.extension.trim().is_empty() {
            return Err(CoreError::Config("extension must not be empty".to_string()));
        }

        crate::discovery::JobFilter::new(&self.pattern, &self.extension)?;

        Ok(())
    }
}
