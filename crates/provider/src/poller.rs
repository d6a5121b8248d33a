//! Bounded polling: turn repeated status queries into one awaitable result.
//!
//! A wait is an explicit state machine ([`PollState`]) rather than a chain
//! of self-scheduling callbacks, so the attempt count is data and both
//! cancellation and timeout are ordinary transitions:
//!
//! ```text
//! Querying --complete--------------> Completed
//! Querying --transport error-------> Failed
//! Querying --provider failure------> Failed
//! Querying --processing, budget----> Scheduled --interval--> Querying
//! Querying --processing, no budget-> TimedOut
//! Querying | Scheduled --cancel----> Cancelled
//! ```
//!
//! Attempts are strictly sequential. The inter-attempt timer is a
//! [`tokio::time::Sleep`] owned by the current step, so leaving the
//! `Scheduled` phase for any reason drops it.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use songbridge_core::types::TaskId;
use tokio_util::sync::CancellationToken;

use crate::status::{StatusError, StatusReport, StatusSource};

/// Default delay between two status queries.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Default number of status queries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 18;

/// Poll budget for a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between the end of one attempt and the start of the next.
    pub interval: Duration,
    /// Upper bound on the total number of status queries.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Where a wait currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Querying,
    Scheduled,
    Completed,
    TimedOut,
    Failed,
    Cancelled,
}

impl PollPhase {
    /// Terminal phases issue no further queries.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollPhase::Completed | PollPhase::TimedOut | PollPhase::Failed | PollPhase::Cancelled
        )
    }
}

/// Why a wait ended without an audio URL.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// A status query failed at the transport level; not retried.
    #[error("Status query failed on attempt {attempts}: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: StatusError,
    },

    /// The poll budget ran out while the task was still processing.
    #[error("Task still processing after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// The provider reported that the task will never complete.
    #[error("Generation failed: {reason}")]
    TaskFailed { reason: String },

    /// The caller cancelled the wait.
    #[error("Wait cancelled")]
    Cancelled,

    /// This waiter is already polling the same task.
    #[error("Already waiting for task {0}")]
    AlreadyWaiting(TaskId),
}

/// Per-wait bookkeeping, owned exclusively by the waiting future.
#[derive(Debug)]
pub struct PollState {
    task_id: TaskId,
    attempts_made: u32,
    max_attempts: u32,
    interval: Duration,
    phase: PollPhase,
    outcome: Option<Result<String, PollError>>,
}

impl PollState {
    /// Start a wait in the `Querying` phase.
    ///
    /// A zero budget times out before the first query.
    pub fn new(task_id: TaskId, config: &PollConfig) -> Self {
        let mut state = Self {
            task_id,
            attempts_made: 0,
            max_attempts: config.max_attempts,
            interval: config.interval,
            phase: PollPhase::Querying,
            outcome: None,
        };
        if config.max_attempts == 0 {
            state.finish(PollPhase::TimedOut, Err(PollError::Timeout { attempts: 0 }));
        }
        state
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Apply the result of the query that just returned.
    pub fn observe(&mut self, result: Result<StatusReport, StatusError>) {
        if self.phase != PollPhase::Querying {
            return;
        }
        self.attempts_made += 1;
        let attempts = self.attempts_made;

        match result {
            Err(source) => {
                tracing::warn!(task_id = %self.task_id, attempts, error = %source, "Status query failed");
                self.finish(PollPhase::Failed, Err(PollError::Transport { attempts, source }));
            }
            Ok(StatusReport::Complete { audio_url }) => {
                tracing::info!(task_id = %self.task_id, attempts, audio_url = %audio_url, "Task complete");
                self.finish(PollPhase::Completed, Ok(audio_url));
            }
            Ok(StatusReport::Failed { reason }) => {
                tracing::warn!(task_id = %self.task_id, attempts, reason = %reason, "Provider reported task failure");
                self.finish(PollPhase::Failed, Err(PollError::TaskFailed { reason }));
            }
            Ok(StatusReport::Processing) if attempts >= self.max_attempts => {
                tracing::warn!(task_id = %self.task_id, attempts, "Poll budget exhausted");
                self.finish(PollPhase::TimedOut, Err(PollError::Timeout { attempts }));
            }
            Ok(StatusReport::Processing) => {
                tracing::debug!(
                    task_id = %self.task_id,
                    attempts,
                    max_attempts = self.max_attempts,
                    "Task still processing",
                );
                self.phase = PollPhase::Scheduled;
            }
        }
    }

    /// The interval elapsed; query again.
    pub fn resume(&mut self) {
        if self.phase == PollPhase::Scheduled {
            self.phase = PollPhase::Querying;
        }
    }

    /// Cancellation was observed. No effect once terminal.
    pub fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            tracing::info!(task_id = %self.task_id, attempts = self.attempts_made, "Wait cancelled");
            self.finish(PollPhase::Cancelled, Err(PollError::Cancelled));
        }
    }

    /// Consume the state, yielding the terminal outcome.
    ///
    /// A state abandoned before reaching a terminal phase counts as
    /// cancelled.
    pub fn into_outcome(self) -> Result<String, PollError> {
        self.outcome.unwrap_or(Err(PollError::Cancelled))
    }

    fn finish(&mut self, phase: PollPhase, outcome: Result<String, PollError>) {
        self.phase = phase;
        self.outcome = Some(outcome);
    }
}

/// Wait until `source` reports `task_id` complete.
///
/// Returns the audio URL, or the reason the wait ended without one. A
/// cancellation observed before a query result is processed always wins,
/// so the wait never resolves as complete after cancellation was seen.
pub async fn wait_for_completion<S>(
    source: &S,
    task_id: &TaskId,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<String, PollError>
where
    S: StatusSource + ?Sized,
{
    let mut state = PollState::new(task_id.clone(), config);
    tracing::debug!(
        task_id = %task_id,
        interval_ms = config.interval.as_millis() as u64,
        max_attempts = config.max_attempts,
        "Waiting for completion",
    );

    while !state.phase().is_terminal() {
        match state.phase() {
            PollPhase::Querying => {
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    result = source.query(task_id) => Some(result),
                };
                match result {
                    Some(result) => state.observe(result),
                    None => state.cancel(),
                }
            }
            PollPhase::Scheduled => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => state.cancel(),
                    () = tokio::time::sleep(state.interval) => state.resume(),
                }
            }
            _ => break,
        }
    }

    state.into_outcome()
}

/// A waiting client that polls at most once per task id at a time.
pub struct CompletionWaiter<S> {
    source: S,
    config: PollConfig,
    in_flight: Mutex<HashSet<TaskId>>,
}

impl<S: StatusSource> CompletionWaiter<S> {
    pub fn new(source: S, config: PollConfig) -> Self {
        Self {
            source,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Wait for `task_id`, rejecting a second concurrent wait on the same id.
    pub async fn wait(
        &self,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<String, PollError> {
        let _claim = self.claim(task_id)?;
        wait_for_completion(&self.source, task_id, &self.config, cancel).await
    }

    /// Whether a wait for `task_id` is currently in progress.
    pub fn is_waiting(&self, task_id: &TaskId) -> bool {
        self.lock_in_flight().contains(task_id)
    }

    fn claim(&self, task_id: &TaskId) -> Result<InFlightClaim<'_>, PollError> {
        if !self.lock_in_flight().insert(task_id.clone()) {
            return Err(PollError::AlreadyWaiting(task_id.clone()));
        }
        Ok(InFlightClaim {
            in_flight: &self.in_flight,
            task_id: task_id.clone(),
        })
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<TaskId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases a task id from the in-flight set when the wait ends or is
/// dropped.
struct InFlightClaim<'a> {
    in_flight: &'a Mutex<HashSet<TaskId>>,
    task_id: TaskId,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.task_id);
    }
}
