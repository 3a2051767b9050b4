// ============================================================================
// cuebatch-core/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Batch Timer, Counters and Progress Events
//
// This module tracks batch progress (completed/total, elapsed time, throughput)
// and forwards it as events to a consumer-supplied sink. It never renders
// anything itself; the CLI decides whether events become a progress bar or
// log lines.
//
// KEY COMPONENTS:
// - ProgressEvent: Enum of batch progress events
// - ProgressSink: Trait for receiving progress events
// - NullProgressSink: No-op implementation for when reporting isn't needed
// - ProgressReporter: Timer and counters, safe under concurrent completions

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ============================================================================
// PROGRESS EVENTS
// ============================================================================

/// Events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The batch has started with `total` jobs
    BatchStarted { total: usize },

    /// A job was admitted and its handler is running
    JobStarted { job: String },

    /// A job completed; counters after the increment
    Progress {
        completed: usize,
        total: usize,
        /// Jobs per second, `None` while no time has elapsed
        rate: Option<f64>,
    },

    /// A job's handler reported a failure. The job still counts as completed.
    JobFailed { job: String, message: String },

    /// Every job has completed
    BatchFinished {
        completed: usize,
        total: usize,
        elapsed: Duration,
    },
}

// ============================================================================
// PROGRESS SINK
// ============================================================================

/// Trait for receiving progress events.
///
/// Implementations must be cheap; they are called from the batch's control
/// flow after every job completion.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// No-op implementation of ProgressSink.
#[derive(Debug, Clone, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_progress(&self, _event: ProgressEvent) {
        // Do nothing
    }
}

/// Formats a rate for display, `N/A` when undefined.
#[must_use]
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.2}/s"),
        None => "N/A".to_string(),
    }
}

// ============================================================================
// REPORTER
// ============================================================================

/// Point-in-time view of the reporter's counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub rate: Option<f64>,
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({})",
            self.completed,
            self.total,
            format_rate(self.rate)
        )
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    total: usize,
    completed: usize,
    started_at: Option<Instant>,
    frozen: Option<Duration>,
}

impl ReporterState {
    fn elapsed(&self) -> Duration {
        match (self.frozen, self.started_at) {
            (Some(frozen), _) => frozen,
            (None, Some(started_at)) => started_at.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            Some(self.completed as f64 / secs)
        } else {
            None
        };
        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
            elapsed,
            rate,
        }
    }
}

/// Tracks elapsed time and completed/total job counts for one batch.
///
/// All methods take `&self`; counters live behind a mutex so completions
/// arriving from several tasks are applied one at a time.
pub struct ProgressReporter {
    state: Mutex<ReporterState>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: Mutex::new(ReporterState::default()),
            sink,
        }
    }

    /// Reporter that discards every event.
    pub fn silent() -> Self {
        Self::new(Arc::new(NullProgressSink))
    }

    /// Records the job total and starts the timer. Resets the counter.
    pub fn start(&self, total: usize) {
        {
            let mut state = self.lock_state();
            *state = ReporterState {
                total,
                completed: 0,
                started_at: Some(Instant::now()),
                frozen: None,
            };
        }
        self.sink.on_progress(ProgressEvent::BatchStarted { total });
    }

    /// Counts one completed job and emits a progress event.
    pub fn increment(&self) -> ProgressSnapshot {
        let snapshot = {
            let mut state = self.lock_state();
            state.completed += 1;
            state.snapshot()
        };
        self.sink.on_progress(ProgressEvent::Progress {
            completed: snapshot.completed,
            total: snapshot.total,
            rate: snapshot.rate,
        });
        snapshot
    }

    /// Forwards an event to the sink without touching the counters.
    pub fn emit(&self, event: ProgressEvent) {
        self.sink.on_progress(event);
    }

    /// Wall-clock time since `start`, or the frozen value after `stop`.
    pub fn elapsed(&self) -> Duration {
        self.lock_state().elapsed()
    }

    /// Completed jobs per second; `None` while no time has elapsed.
    pub fn rate(&self) -> Option<f64> {
        self.lock_state().snapshot().rate
    }

    pub fn completed(&self) -> usize {
        self.lock_state().completed
    }

    pub fn total(&self) -> usize {
        self.lock_state().total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock_state().snapshot()
    }

    /// Freezes the timer and emits `BatchFinished`. Calling `stop` again
    /// keeps the first frozen value.
    pub fn stop(&self) -> ProgressSnapshot {
        let snapshot = {
            let mut state = self.lock_state();
            if state.frozen.is_none() {
                state.frozen = Some(state.elapsed());
            }
            state.snapshot()
        };
        self.sink.on_progress(ProgressEvent::BatchFinished {
            completed: snapshot.completed,
            total: snapshot.total,
            elapsed: snapshot.elapsed,
        });
        snapshot
    }

    fn lock_state(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}
