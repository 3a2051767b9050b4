//! Bounded-concurrency job scheduler.
//!
//! Jobs are admitted in submission order while fewer than `cap` of them hold
//! a slot. Each admitted job releases its slot exactly once, when its work
//! finishes, whether the work succeeded, failed or panicked. The scheduler
//! never inspects the work's result; it only observes completion.
//!
//! The admission primitive is [`SlotGate`]: a counter plus a FIFO queue of
//! waiters. Enqueueing is synchronous, so the order in which `submit` is
//! called is exactly the order in which jobs are admitted, independent of how
//! the runtime schedules the spawned tasks.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use log::{debug, trace};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{CoreError, CoreResult};

// ============================================================================
// SLOT GATE
// ============================================================================

#[derive(Debug, Default)]
struct GateState {
    running: usize,
    peak: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Counting admission primitive with a FIFO wait queue.
#[derive(Debug)]
pub struct SlotGate {
    capacity: usize,
    state: Mutex<GateState>,
}

impl SlotGate {
    /// Creates a gate allowing at most `capacity` slots to be held at once.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` when `capacity` is zero.
    pub fn new(capacity: usize) -> CoreResult<Arc<Self>> {
        if capacity == 0 {
            return Err(CoreError::Config(
                "concurrency cap must be at least 1".to_string(),
            ));
        }
        Ok(Arc::new(Self {
            capacity,
            state: Mutex::new(GateState::default()),
        }))
    }

    /// Requests a slot. A slot is granted immediately when one is free and
    /// nobody is queued; otherwise the request joins the back of the queue.
    pub fn enqueue(self: &Arc<Self>) -> SlotTicket {
        let mut state = self.lock_state();
        let state_for_ticket = if state.running < self.capacity && state.waiters.is_empty() {
            state.running += 1;
            state.peak = state.peak.max(state.running);
            TicketState::Granted
        } else {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            TicketState::Waiting(rx)
        };

        SlotTicket {
            gate: Arc::clone(self),
            state: state_for_ticket,
        }
    }

    /// Hands the slot to the oldest live waiter, or frees it.
    fn release(&self) {
        let mut state = self.lock_state();
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                // Slot changes owner; the running count is unchanged.
                return;
            }
        }
        state.running = state.running.saturating_sub(1);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn running(&self) -> usize {
        self.lock_state().running
    }

    /// Number of requests waiting for a slot.
    pub fn queued(&self) -> usize {
        self.lock_state().waiters.len()
    }

    /// Highest number of slots held at the same time since creation.
    pub fn peak_running(&self) -> usize {
        self.lock_state().peak
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
enum TicketState {
    Granted,
    Waiting(oneshot::Receiver<()>),
    Consumed,
}

/// A pending or granted slot request.
///
/// Dropping a ticket that already owns a slot gives the slot back.
#[derive(Debug)]
pub struct SlotTicket {
    gate: Arc<SlotGate>,
    state: TicketState,
}

impl SlotTicket {
    /// True when the slot was available at enqueue time.
    pub fn is_granted(&self) -> bool {
        matches!(self.state, TicketState::Granted)
    }

    /// Waits until this request reaches the front of the queue and a slot
    /// frees up.
    pub async fn admitted(mut self) -> SlotPermit {
        if let TicketState::Waiting(rx) = &mut self.state {
            // The sender lives in the gate, which this ticket keeps alive, so
            // it is only ever consumed by a successful hand-off.
            let handed_off = rx.await.is_ok();
            debug_assert!(handed_off, "slot gate dropped a queued waiter");
        }
        self.state = TicketState::Consumed;
        SlotPermit {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl Drop for SlotTicket {
    fn drop(&mut self) {
        match &mut self.state {
            TicketState::Granted => self.gate.release(),
            TicketState::Waiting(rx) => {
                rx.close();
                if rx.try_recv().is_ok() {
                    self.gate.release();
                }
            }
            TicketState::Consumed => {}
        }
    }
}

/// A held slot. Dropping it releases the slot exactly once.
#[derive(Debug)]
pub struct SlotPermit {
    gate: Arc<SlotGate>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

// ============================================================================
// JOB TRACKING
// ============================================================================

/// Lifecycle of a job tracked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
struct JobRecord {
    id: String,
    state: JobState,
}

type JobTable = Arc<Mutex<Vec<JobRecord>>>;

fn lock_jobs(jobs: &JobTable) -> MutexGuard<'_, Vec<JobRecord>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owned by a job's task. Releases the slot, then records completion, even
/// when the work panics.
struct CompletionGuard {
    jobs: JobTable,
    index: usize,
    outstanding: Arc<watch::Sender<usize>>,
    permit: Option<SlotPermit>,
}

impl CompletionGuard {
    fn admit(&mut self, permit: SlotPermit) {
        self.permit = Some(permit);
        lock_jobs(&self.jobs)[self.index].state = JobState::Running;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        drop(self.permit.take());
        lock_jobs(&self.jobs)[self.index].state = JobState::Completed;
        self.outstanding.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Future resolving when a submitted job's work has completed.
///
/// Resolves to `CoreError::JobAborted` if the work panicked. Dropping the
/// handle does not cancel the job.
#[derive(Debug)]
pub struct JobHandle<T> {
    job: String,
    inner: JoinHandle<T>,
}

impl<T> JobHandle<T> {
    pub fn job(&self) -> &str {
        &self.job
    }
}

impl<T> Future for JobHandle<T> {
    type Output = CoreResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(err)) => Poll::Ready(Err(CoreError::JobAborted {
                job: self.job.clone(),
                reason: err.to_string(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Admits submitted jobs under a concurrency cap and tracks their lifecycle.
///
/// Must be used from within a tokio runtime; every job runs on its own task.
#[derive(Debug)]
pub struct Scheduler {
    gate: Arc<SlotGate>,
    jobs: JobTable,
    outstanding: Arc<watch::Sender<usize>>,
}

impl Scheduler {
    /// Creates a scheduler allowing `cap` concurrently running jobs.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` when `cap` is zero.
    pub fn new(cap: usize) -> CoreResult<Self> {
        let (outstanding, _) = watch::channel(0usize);
        Ok(Self {
            gate: SlotGate::new(cap)?,
            jobs: Arc::new(Mutex::new(Vec::new())),
            outstanding: Arc::new(outstanding),
        })
    }

    /// Queues `work` under the identifier `job`.
    ///
    /// The returned handle resolves with the work's output once the work has
    /// finished and its slot has been released.
    pub fn submit<F, T>(&self, job: impl Into<String>, work: F) -> JobHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let job = job.into();
        let index = {
            let mut jobs = lock_jobs(&self.jobs);
            jobs.push(JobRecord {
                id: job.clone(),
                state: JobState::Pending,
            });
            jobs.len() - 1
        };
        self.outstanding.send_modify(|count| *count += 1);

        let ticket = self.gate.enqueue();
        trace!(
            "Job '{}' queued (granted immediately: {})",
            job,
            ticket.is_granted()
        );

        let mut guard = CompletionGuard {
            jobs: Arc::clone(&self.jobs),
            index,
            outstanding: Arc::clone(&self.outstanding),
            permit: None,
        };
        let task_job = job.clone();
        let inner = tokio::spawn(async move {
            let permit = ticket.admitted().await;
            guard.admit(permit);
            debug!("Job '{}' admitted", task_job);
            let output = work.await;
            debug!("Job '{}' finished", task_job);
            drop(guard);
            output
        });

        JobHandle { job, inner }
    }

    /// Waits until every submitted job has completed and released its slot.
    pub async fn await_all(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender is owned by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Number of jobs currently holding a slot.
    pub fn running_count(&self) -> usize {
        self.gate.running()
    }

    /// Number of jobs admitted-or-queued that have not completed yet.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Highest number of simultaneously running jobs observed.
    pub fn peak_running(&self) -> usize {
        self.gate.peak_running()
    }

    /// State of the first job submitted under `job`.
    pub fn job_state(&self, job: &str) -> Option<JobState> {
        lock_jobs(&self.jobs)
            .iter()
            .find(|record| record.id == job)
            .map(|record| record.state)
    }

    /// Snapshot of every job in submission order.
    pub fn states(&self) -> Vec<(String, JobState)> {
        lock_jobs(&self.jobs)
            .iter()
            .map(|record| (record.id.clone(), record.state))
            .collect()
    }
}
