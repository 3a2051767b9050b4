//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command. The
//! helpers here turn the shared flags into a core configuration and pick the
//! progress rendering.

use std::sync::Arc;

use cuebatch_core::config::{CoreConfig, CoreConfigBuilder};
use cuebatch_core::progress::ProgressSink;

use crate::cli::GlobalArgs;
use crate::terminal::{LogSink, ProgressBarSink};

/// `run`: external command per matching file.
pub mod run;
/// `retime`: subtitle retiming batch.
pub mod retime;
pub mod shift;

/// Builds the core configuration from the shared flags.
pub fn build_config(global: &GlobalArgs, extension: &str) -> CoreConfig {
    CoreConfigBuilder::new()
        .input_dir(global.dir.clone())
        .extension(extension)
        .pattern(&global.pattern)
        .max_concurrent(global.jobs)
        .resync_offset_ms(global.offset)
        .gap_threshold_ms(global.threshold)
        .log_stderr(global.debug)
        .build()
}

/// Log lines in verbose mode or when emitting JSON, a progress bar otherwise.
pub fn progress_sink(global: &GlobalArgs) -> Arc<dyn ProgressSink> {
    if global.verbose || global.json {
        Arc::new(LogSink)
    } else {
        Arc::new(ProgressBarSink::new())
    }
}
