//! In-memory command invoker for tests and dry runs.
//!
//! [`RecordingInvoker`] never spawns a process. It records every command it
//! receives, optionally sleeps to simulate work, and returns a scripted
//! outcome. Side effects (such as an output file ffmpeg would have written)
//! can be simulated with [`RecordingInvoker::on_invoke`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{CommandInvoker, CommandOutcome, CommandSpec};

type InvokeHook = Arc<dyn Fn(&CommandSpec) + Send + Sync>;

#[derive(Default)]
struct Recorded {
    calls: Vec<CommandSpec>,
    failures: Vec<(String, CommandOutcome)>,
}

/// Test double that records invocations instead of running them.
#[derive(Clone, Default)]
pub struct RecordingInvoker {
    recorded: Arc<Mutex<Recorded>>,
    delay: Duration,
    hook: Option<InvokeHook>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` inside every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every command whose rendered line contains `needle` fail with
    /// exit code 1 and the given diagnostics.
    pub fn fail_when(self, needle: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        self.lock()
            .failures
            .push((needle.into(), CommandOutcome::failed(Some(1), diagnostics)));
        self
    }

    /// Runs `hook` for every successful invocation, before it returns.
    pub fn on_invoke<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CommandSpec) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Commands received so far, in invocation order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Highest number of invocations observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CommandInvoker for RecordingInvoker {
    async fn invoke(&self, command: &CommandSpec) -> CommandOutcome {
        let scripted = {
            let mut recorded = self.lock();
            recorded.calls.push(command.clone());
            let line = command.to_string();
            recorded
                .failures
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
                .map(|(_, outcome)| outcome.clone())
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(outcome) => outcome,
            None => {
                if let Some(hook) = &self.hook {
                    hook(command);
                }
                CommandOutcome::succeeded()
            }
        }
    }
}

impl std::fmt::Debug for RecordingInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingInvoker")
            .field("calls", &self.call_count())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
