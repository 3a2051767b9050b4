//! Core library for batch processing media files under a concurrency cap and
//! retiming subtitle tracks.
//!
//! This crate provides file discovery and filtering, a FIFO job scheduler with
//! a hard limit on concurrently running jobs, batch progress reporting, an
//! external command seam, and the cue timing pipeline
//! (`Resync -> ClampNegativeStart -> GapFill`) used to clean up subtitles.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cuebatch_core::{BatchRunner, CommandTemplateHandler, CoreConfig, ProcessInvoker};
//! use cuebatch_core::progress::NullProgressSink;
//!
//! # async fn run() -> cuebatch_core::CoreResult<()> {
//! let mut config = CoreConfig::new("dist");
//! config.pattern = "ep0[1-3]".to_string();
//! config.max_concurrent = 4;
//! config.validate()?;
//!
//! let runner = BatchRunner::new(
//!     config.clone(),
//!     Arc::new(ProcessInvoker::from_config(&config)),
//!     Arc::new(NullProgressSink),
//! );
//! let summary = runner
//!     .run(CommandTemplateHandler::new("ffmpeg -y -i {input} {dir}/{stem}.m4a")?)
//!     .await?;
//! println!("{} of {} jobs succeeded", summary.succeeded(), summary.total);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod progress;
pub mod scheduler;
pub mod subtitle;
pub mod timeline;
pub mod utils;

// Re-exports for public API
pub use batch::{
    BatchRunner, BatchSummary, CommandTemplateHandler, JobContext, JobHandler,
    SubtitleRetimeHandler,
};
pub use config::{CoreConfig, CoreConfigBuilder};
pub use discovery::{JobFilter, list_candidates};
pub use error::{CoreError, CoreResult};
pub use external::{CommandInvoker, CommandOutcome, CommandSpec, ProcessInvoker};
pub use progress::{ProgressEvent, ProgressReporter, ProgressSink};
pub use scheduler::{JobHandle, JobState, Scheduler, SlotGate};
pub use subtitle::{RetimeOptions, SubtitleOutcome, SubtitlePaths, retime_subtitle};
pub use timeline::{Cue, Stage, Timeline, TimelinePipeline};
pub use utils::format_total_time;
