// ============================================================================
// cuebatch-core/src/batch.rs
// ============================================================================
//
// BATCH ORCHESTRATION: Discover, Filter, Schedule and Report
//
// This module drives one batch run from start to finish:
//
//   1. List candidate files in the input directory (failure aborts the batch)
//   2. Keep the names matching ^<pattern>\.<extension>$
//   3. Start the progress timer with the job total
//   4. Submit one job per name to the scheduler, in listing order
//   5. Count each job as completed when its handle resolves
//   6. Wait for the scheduler to drain, stop the timer, return a summary
//
// A job whose handler fails still counts as completed. The failure is logged,
// forwarded to the progress sink and listed in the summary.
//
// KEY COMPONENTS:
// - JobContext: Everything a handler needs to process one file
// - JobHandler: Trait implemented by per-file work
// - CommandTemplateHandler: Runs an external command built from a template
// - SubtitleRetimeHandler: Retimes one ASS track per job
// - BatchRunner: The orchestrator
// - BatchSummary: Serializable result of a run

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use crate::config::CoreConfig;
use crate::discovery::{JobFilter, list_candidates};
use crate::error::{CoreError, CoreResult};
use crate::external::{CommandInvoker, CommandSpec};
use crate::progress::{ProgressEvent, ProgressReporter, ProgressSink};
use crate::scheduler::Scheduler;
use crate::subtitle::{
    DEFAULT_VIDEO_DIR_REF, ORIGINAL_SUFFIX, RetimeOptions, SubtitleOutcome, SubtitlePaths,
    file_stem_without, retime_subtitle,
};
use crate::timeline::TimelinePipeline;

// ============================================================================
// JOB HANDLERS
// ============================================================================

/// Inputs for processing one job.
#[derive(Clone)]
pub struct JobContext {
    /// File name of the job inside the input directory
    pub job_id: String,
    /// Full path of the job's file
    pub path: PathBuf,
    pub config: Arc<CoreConfig>,
    pub invoker: Arc<dyn CommandInvoker>,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Work performed once per matching file.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, ctx: JobContext) -> CoreResult<()>;
}

/// Runs an external command for every job.
///
/// The template is split on whitespace first and placeholders are expanded
/// per argument, so file names containing spaces stay a single argument.
///
/// | Placeholder | Value                                  |
/// |-------------|----------------------------------------|
/// | `{input}`   | Full path of the job's file            |
/// | `{name}`    | File name                              |
/// | `{stem}`    | File name without its extension        |
/// | `{dir}`     | Input directory                        |
#[derive(Debug, Clone)]
pub struct CommandTemplateHandler {
    template: CommandSpec,
}

impl CommandTemplateHandler {
    /// # Errors
    ///
    /// Returns `CoreError::EmptyCommand` if the template is blank.
    pub fn new(template: &str) -> CoreResult<Self> {
        Ok(Self {
            template: CommandSpec::parse(template)?,
        })
    }

    /// Builds the concrete command for one job.
    pub fn expand(&self, ctx: &JobContext) -> CommandSpec {
        let stem = Path::new(&ctx.job_id)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&ctx.job_id);
        let input = ctx.path.to_string_lossy();
        let dir = ctx.config.input_dir.to_string_lossy();

        let substitute = |token: &str| {
            token
                .replace("{input}", &input)
                .replace("{name}", &ctx.job_id)
                .replace("{stem}", stem)
                .replace("{dir}", &dir)
        };

        CommandSpec::new(substitute(&self.template.program))
            .args(self.template.args.iter().map(|arg| substitute(arg)))
    }
}

#[async_trait]
impl JobHandler for CommandTemplateHandler {
    async fn handle(&self, ctx: JobContext) -> CoreResult<()> {
        let command = self.expand(&ctx);
        let outcome = ctx.invoker.invoke(&command).await;
        if outcome.success {
            Ok(())
        } else {
            Err(CoreError::CommandFailed {
                command: command.to_string(),
                exit_code: outcome.exit_code,
                diagnostics: outcome.diagnostics,
            })
        }
    }
}

/// Retimes the ASS track named by each job.
#[derive(Debug, Clone)]
pub struct SubtitleRetimeHandler {
    pipeline: TimelinePipeline,
    options: RetimeOptions,
    video_dir_ref: String,
    video_extension: String,
}

impl SubtitleRetimeHandler {
    pub fn new(pipeline: TimelinePipeline) -> Self {
        Self {
            pipeline,
            options: RetimeOptions::default(),
            video_dir_ref: DEFAULT_VIDEO_DIR_REF.to_string(),
            video_extension: "mp4".to_string(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(TimelinePipeline::from_config(config))
    }

    pub fn with_options(mut self, options: RetimeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the video location written into rewritten ASS headers, as seen
    /// from the subtitle directory.
    pub fn with_video(mut self, dir_ref: impl Into<String>, extension: impl Into<String>) -> Self {
        self.video_dir_ref = dir_ref.into();
        self.video_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn paths_for(&self, ctx: &JobContext) -> SubtitlePaths {
        let base = file_stem_without(&ctx.job_id, ORIGINAL_SUFFIX);
        SubtitlePaths::new(&ctx.config.input_dir, &ctx.job_id, None).with_video_ref(format!(
            "{}/{}.{}",
            self.video_dir_ref, base, self.video_extension
        ))
    }
}

#[async_trait]
impl JobHandler for SubtitleRetimeHandler {
    async fn handle(&self, ctx: JobContext) -> CoreResult<()> {
        let paths = self.paths_for(&ctx);
        match retime_subtitle(ctx.invoker.as_ref(), &paths, &self.pipeline, self.options).await? {
            SubtitleOutcome::Skipped => debug!("Nothing to retime for '{}'", ctx.job_id),
            SubtitleOutcome::Retimed { cues } => {
                debug!("'{}' retimed with {} cue(s)", ctx.job_id, cues);
            }
        }
        Ok(())
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Result of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Jobs submitted
    pub total: usize,
    /// Jobs whose handle resolved, successful or not
    pub completed: usize,
    /// Identifiers of jobs whose handler reported a failure, sorted
    pub failed: Vec<String>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.completed.saturating_sub(self.failed.len())
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

// ============================================================================
// BATCH RUNNER
// ============================================================================

type StartHook = Box<dyn Fn(usize) + Send + Sync>;
type StopHook = Box<dyn Fn(&BatchSummary) + Send + Sync>;

/// Orchestrates one batch over the configured input directory.
pub struct BatchRunner {
    config: CoreConfig,
    invoker: Arc<dyn CommandInvoker>,
    sink: Arc<dyn ProgressSink>,
    on_start: Option<StartHook>,
    on_stop: Option<StopHook>,
}

impl BatchRunner {
    pub fn new(
        config: CoreConfig,
        invoker: Arc<dyn CommandInvoker>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            invoker,
            sink,
            on_start: None,
            on_stop: None,
        }
    }

    /// Called with the job total after filtering, before any job is submitted.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Called with the summary after every job has completed.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BatchSummary) + Send + Sync + 'static,
    {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Runs `handler` once per matching file.
    ///
    /// # Errors
    ///
    /// Only batch-level failures are returned: an invalid configuration or an
    /// unreadable input directory. Both happen before any job is submitted.
    /// Per-job failures are reported in [`BatchSummary::failed`].
    pub async fn run<H>(&self, handler: H) -> CoreResult<BatchSummary>
    where
        H: JobHandler + 'static,
    {
        self.config.validate()?;

        let candidates = list_candidates(&self.config.input_dir)?;
        let filter = JobFilter::new(&self.config.pattern, &self.config.extension)?;
        let jobs = filter.filter(candidates);
        info!(
            "Found {} job(s) matching {} in {}",
            jobs.len(),
            filter.as_str(),
            self.config.input_dir.display()
        );

        if let Some(hook) = &self.on_start {
            hook(jobs.len());
        }

        let reporter = ProgressReporter::new(Arc::clone(&self.sink));
        reporter.start(jobs.len());

        let scheduler = Scheduler::new(self.config.max_concurrent)?;
        let handler: Arc<dyn JobHandler> = Arc::new(handler);
        let config = Arc::new(self.config.clone());

        let mut pending = FuturesUnordered::new();
        for job_id in jobs {
            let ctx = JobContext {
                path: config.input_dir.join(&job_id),
                job_id: job_id.clone(),
                config: Arc::clone(&config),
                invoker: Arc::clone(&self.invoker),
            };
            let handler = Arc::clone(&handler);
            let sink = Arc::clone(&self.sink);
            let handle = scheduler.submit(job_id.clone(), async move {
                sink.on_progress(ProgressEvent::JobStarted {
                    job: ctx.job_id.clone(),
                });
                handler.handle(ctx).await
            });
            pending.push(async move { (job_id, handle.await) });
        }

        let mut failed = Vec::new();
        while let Some((job, result)) = pending.next().await {
            // A panicking job surfaces as JobAborted from the outer result.
            if let Err(e) = result.and_then(|inner| inner) {
                warn!("Job '{}' failed: {}", job, e);
                reporter.emit(ProgressEvent::JobFailed {
                    job: job.clone(),
                    message: e.to_string(),
                });
                failed.push(job);
            }
            reporter.increment();
        }

        scheduler.await_all().await;
        let snapshot = reporter.stop();
        failed.sort();

        let summary = BatchSummary {
            total: snapshot.total,
            completed: snapshot.completed,
            failed,
            elapsed: snapshot.elapsed,
            finished_at: Local::now(),
        };
        info!(
            "Batch finished: {} ({} failed, peak concurrency {})",
            snapshot,
            summary.failed.len(),
            scheduler.peak_running()
        );

        if let Some(hook) = &self.on_stop {
            hook(&summary);
        }

        Ok(summary)
    }
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
