//! Task lifecycle tracking.
//!
//! [`Poller::await_completion`] queries the task status once per interval until
//! the marketplace reports a terminal state, the local deadline passes, or the
//! caller cancels. Status query failures are treated as transient: they are
//! logged and the next poll happens on schedule.

use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::OrchestrationError;
use crate::marketplace::{Marketplace, TaskHandle, TaskState, TaskStatusReport};

/// Message used when the marketplace reports a failure without details.
pub const DEFAULT_FAILURE_MESSAGE: &str = "task execution failed";

/// How a polling run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { polls: u32, elapsed: Duration },
    Cancelled,
}

pub struct Poller<'a, M: ?Sized> {
    marketplace: &'a M,
    interval: Duration,
}

impl<'a, M: Marketplace + ?Sized> Poller<'a, M> {
    pub fn new(marketplace: &'a M, interval: Duration) -> Self {
        Self { marketplace, interval }
    }

    /// Poll `handle` until it completes.
    ///
    /// Returns `Completed` without sleeping when the first query already reports
    /// completion. A marketplace-reported failure or timeout is returned
    /// immediately as [`OrchestrationError::TaskFailed`]; running out of
    /// `deadline` yields [`OrchestrationError::Timeout`] and no further queries.
    pub async fn await_completion(
        &self,
        handle: &TaskHandle,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, OrchestrationError> {
        let task_id = &handle.task_id;
        let started = Instant::now();
        let deadline_at = started + deadline;
        let mut last_state: Option<TaskState> = None;
        let mut polls: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!(task_id = %task_id, polls, "polling cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            if Instant::now() >= deadline_at {
                return Err(self.timed_out(handle, started, polls));
            }

            polls += 1;
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task_id = %task_id, polls, "polling cancelled during status query");
                    return Ok(PollOutcome::Cancelled);
                }
                _ = sleep_until(deadline_at) => return Err(self.timed_out(handle, started, polls)),
                report = self.marketplace.task_status(task_id) => report,
            };

            match report {
                Ok(report) => {
                    observe_transition(handle, last_state, report.state);
                    last_state = Some(report.state);
                    if report.state.is_terminal() {
                        return finish(handle, report, started, polls);
                    }
                }
                Err(error) => {
                    warn!(task_id = %task_id, polls, error = %error, "status query failed; retrying");
                }
            }

            let remaining = deadline_at.saturating_duration_since(Instant::now());
            let pause = self.interval.min(remaining);
            debug!(task_id = %task_id, pause_ms = pause.as_millis(), "waiting before next poll");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task_id = %task_id, polls, "polling cancelled while waiting");
                    return Ok(PollOutcome::Cancelled);
                }
                _ = sleep(pause) => {}
            }
        }
    }

    fn timed_out(&self, handle: &TaskHandle, started: Instant, polls: u32) -> OrchestrationError {
        let elapsed = started.elapsed();
        warn!(task_id = %handle.task_id, polls, elapsed_ms = elapsed.as_millis(), "task deadline reached");
        OrchestrationError::Timeout {
            task_id: handle.task_id.to_string(),
            elapsed,
        }
    }
}

/// Turn a terminal report into the polling result.
fn finish(handle: &TaskHandle, report: TaskStatusReport, started: Instant, polls: u32) -> Result<PollOutcome, OrchestrationError> {
    let task_id = &handle.task_id;
    if report.state == TaskState::Completed {
        let elapsed = started.elapsed();
        info!(task_id = %task_id, polls, elapsed_ms = elapsed.as_millis(), "task completed");
        return Ok(PollOutcome::Completed { polls, elapsed });
    }

    let message = report
        .message
        .unwrap_or_else(|| format!("{DEFAULT_FAILURE_MESSAGE} ({})", report.state));
    warn!(task_id = %task_id, state = %report.state, message = %message, "task ended without a result");
    Err(OrchestrationError::task_failed(task_id.as_str(), message))
}

fn observe_transition(handle: &TaskHandle, previous: Option<TaskState>, next: TaskState) {
    match previous {
        None => info!(task_id = %handle.task_id, state = %next, "task state observed"),
        Some(previous) if previous == next => {}
        Some(previous) if previous.can_reach(next) => {
            info!(task_id = %handle.task_id, from = %previous, to = %next, "task state changed");
        }
        Some(previous) => {
            warn!(task_id = %handle.task_id, from = %previous, to = %next, "irregular task state transition");
        }
    }
}
