//! Polling loop for asynchronous executions.
//!
//! An explicit state machine over the execution lifecycle. Time is
//! injected through the Sleeper trait so the loop can be tested without
//! real delays, and cancellation is cooperative: a shared flag is checked
//! before every status request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{ExecutionApi, ExecutionState, ExecutionStatus};
use crate::error::Result;

/// Sleep abstraction so polling can be driven by fake time in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared cancellation flag checked by the polling loop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a submitted execution.
///
/// The state is only mutated by the polling loop, and a terminal state is
/// final: transitions out of it are ignored.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub execution_id: String,
    pub submitted_at: DateTime<Utc>,
    state: ExecutionState,
}

impl ExecutionHandle {
    /// Creates a handle for a freshly submitted execution.
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            submitted_at: Utc::now(),
            state: ExecutionState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Applies a state transition. Transitions out of a terminal state
    /// are ignored and reported as false.
    pub fn transition(&mut self, next: ExecutionState) -> bool {
        if self.state.is_terminal() {
            if next != self.state {
                debug!(
                    "Ignoring transition {} -> {} for execution {}",
                    self.state, next, self.execution_id
                );
            }
            return false;
        }
        self.state = next;
        true
    }
}

/// How a polling wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The execution completed; results can be fetched.
    Completed,
    /// The execution failed with the given provider message.
    Failed(String),
    /// Cancellation was requested and sent.
    Cancelled,
    /// The provider expired the execution.
    Expired,
    /// The max wait elapsed while the execution was still running.
    TimedOut,
}

/// Drives the status endpoint at a fixed interval until a terminal state.
pub struct Poller {
    api: Arc<dyn ExecutionApi>,
    interval: Duration,
    max_wait: Option<Duration>,
    sleeper: Box<dyn Sleeper>,
}

impl Poller {
    /// Creates a poller with the tokio sleeper.
    pub fn new(api: Arc<dyn ExecutionApi>, interval: Duration, max_wait: Option<Duration>) -> Self {
        Self::with_sleeper(api, interval, max_wait, Box::new(TokioSleeper))
    }

    /// Creates a poller with an injected sleeper (for tests).
    pub fn with_sleeper(
        api: Arc<dyn ExecutionApi>,
        interval: Duration,
        max_wait: Option<Duration>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            api,
            interval,
            max_wait,
            sleeper,
        }
    }

    /// Waits for the execution to reach a terminal state.
    ///
    /// `on_tick` is invoked with every status snapshot, which the caller
    /// can use to refresh a progress display. The cancel flag is checked
    /// before each request; once set, one cancel request is issued and
    /// the wait reports Cancelled regardless of the remote state.
    pub async fn wait<F>(
        &self,
        handle: &mut ExecutionHandle,
        cancel: &CancelFlag,
        mut on_tick: F,
    ) -> Result<PollOutcome>
    where
        F: FnMut(&ExecutionStatus) + Send,
    {
        // Elapsed time is accounted in poll intervals, which keeps the
        // loop deterministic under a fake sleeper.
        let mut elapsed = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Ok(self.send_cancel(handle).await);
            }

            let status = self.api.get_execution_status(&handle.execution_id).await?;
            handle.transition(status.state);
            on_tick(&status);

            match status.state {
                ExecutionState::Completed => return Ok(PollOutcome::Completed),
                ExecutionState::Failed => {
                    let message = status
                        .error_message()
                        .unwrap_or("execution failed")
                        .to_string();
                    return Ok(PollOutcome::Failed(message));
                }
                ExecutionState::Cancelled => return Ok(PollOutcome::Cancelled),
                ExecutionState::Expired => return Ok(PollOutcome::Expired),
                ExecutionState::Pending | ExecutionState::Executing => {
                    if let Some(max_wait) = self.max_wait {
                        if elapsed >= max_wait {
                            return Ok(PollOutcome::TimedOut);
                        }
                    }
                    self.sleeper.sleep(self.interval).await;
                    elapsed += self.interval;
                }
            }
        }
    }

    /// Issues the cancel request and marks the handle cancelled.
    ///
    /// The handle is cancelled locally even if the remote call fails;
    /// the user asked to stop waiting either way.
    async fn send_cancel(&self, handle: &mut ExecutionHandle) -> PollOutcome {
        match self.api.cancel_execution(&handle.execution_id).await {
            Ok(acknowledged) => {
                if !acknowledged {
                    warn!(
                        "Cancellation of {} was not acknowledged by the provider",
                        handle.execution_id
                    );
                }
            }
            Err(e) => warn!("Failed to cancel execution {}: {e}", handle.execution_id),
        }
        handle.transition(ExecutionState::Cancelled);
        PollOutcome::Cancelled
    }
}
