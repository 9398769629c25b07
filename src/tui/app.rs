//! Application state for the watch TUI.

use std::time::Duration;

use crate::api::{ExecutionState, ExecutionStatus, ResultsResponse};
use crate::poll::{CancelFlag, PollOutcome};

/// Messages sent from the polling task to the UI loop.
#[derive(Debug)]
pub enum WatchMessage {
    /// A fresh status snapshot.
    Status(Box<ExecutionStatus>),
    /// Polling finished with this outcome.
    Finished(PollOutcome),
    /// Results fetched after completion.
    Results(Box<ResultsResponse>),
    /// Polling or the results fetch failed.
    Error(String),
}

/// State of the watch screen.
pub struct WatchApp {
    pub execution_id: String,
    pub state: ExecutionState,
    pub queue_position: Option<u32>,
    pub elapsed: Duration,
    pub interval: Duration,
    /// State-change log shown in the middle pane.
    pub log: Vec<String>,
    pub results: Option<ResultsResponse>,
    pub error: Option<String>,
    pub outcome: Option<PollOutcome>,
    pub cancel: CancelFlag,
    pub cancel_requested: bool,
    pub running: bool,
    pub max_display_rows: usize,
}

impl WatchApp {
    /// Creates the initial state for watching an execution.
    pub fn new(
        execution_id: impl Into<String>,
        interval: Duration,
        cancel: CancelFlag,
        max_display_rows: usize,
    ) -> Self {
        let execution_id = execution_id.into();
        Self {
            log: vec![format!("Watching execution {execution_id}")],
            execution_id,
            state: ExecutionState::Pending,
            queue_position: None,
            elapsed: Duration::ZERO,
            interval,
            results: None,
            error: None,
            outcome: None,
            cancel,
            cancel_requested: false,
            running: true,
            max_display_rows,
        }
    }

    /// Returns true once nothing will change anymore.
    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Applies a message from the polling task.
    pub fn apply(&mut self, message: WatchMessage) {
        match message {
            WatchMessage::Status(status) => self.apply_status(&status),
            WatchMessage::Finished(outcome) => self.finish(outcome),
            WatchMessage::Results(results) => self.results = Some(*results),
            WatchMessage::Error(message) => {
                self.log.push(format!("Error: {message}"));
                self.error = Some(message);
            }
        }
    }

    fn apply_status(&mut self, status: &ExecutionStatus) {
        if status.state != self.state {
            self.log.push(format!("State changed to {}", status.state));
        }
        self.state = status.state;
        self.queue_position = status.queue_position;
        self.elapsed += self.interval;
    }

    fn finish(&mut self, outcome: PollOutcome) {
        let line = match &outcome {
            PollOutcome::Completed => "Execution completed".to_string(),
            PollOutcome::Failed(message) => format!("Execution failed: {message}"),
            PollOutcome::Cancelled => "Execution cancelled".to_string(),
            PollOutcome::Expired => "Execution expired".to_string(),
            PollOutcome::TimedOut => "Gave up waiting (execution keeps running)".to_string(),
        };
        self.log.push(line);
        if let PollOutcome::Failed(message) = &outcome {
            self.error = Some(message.clone());
        }
        self.outcome = Some(outcome);
    }

    /// Requests cooperative cancellation; the polling task sends the
    /// cancel request on its next tick.
    pub fn request_cancel(&mut self) {
        if self.cancel_requested || self.is_settled() {
            return;
        }
        self.cancel_requested = true;
        self.cancel.cancel();
        self.log.push("Cancellation requested...".to_string());
    }

    /// One-line status summary for the header.
    pub fn status_line(&self) -> String {
        let mut line = format!("{} | elapsed {}s", self.state, self.elapsed.as_secs());
        if let Some(position) = self.queue_position {
            line.push_str(&format!(" | queue position {position}"));
        }
        if self.cancel_requested && !self.is_settled() {
            line.push_str(" | cancelling...");
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ExecutionTimes;

    fn status(state: ExecutionState, queue_position: Option<u32>) -> ExecutionStatus {
        ExecutionStatus {
            execution_id: "e1".to_string(),
            query_id: None,
            state,
            queue_position,
            times: ExecutionTimes::default(),
            error: None,
        }
    }

    fn app() -> WatchApp {
        WatchApp::new("e1", Duration::from_secs(3), CancelFlag::new(), 1000)
    }

    #[test]
    fn test_status_updates_log_only_on_change() {
        let mut app = app();
        app.apply(WatchMessage::Status(Box::new(status(
            ExecutionState::Executing,
            None,
        ))));
        app.apply(WatchMessage::Status(Box::new(status(
            ExecutionState::Executing,
            None,
        ))));

        let changes = app
            .log
            .iter()
            .filter(|l| l.contains("State changed"))
            .count();
        assert_eq!(changes, 1);
        assert_eq!(app.elapsed, Duration::from_secs(6));
    }

    #[test]
    fn test_finish_settles_app() {
        let mut app = app();
        assert!(!app.is_settled());

        app.apply(WatchMessage::Finished(PollOutcome::Completed));
        assert!(app.is_settled());
        assert!(app.log.iter().any(|l| l.contains("completed")));
    }

    #[test]
    fn test_failed_outcome_records_error() {
        let mut app = app();
        app.apply(WatchMessage::Finished(PollOutcome::Failed(
            "division by zero".to_string(),
        )));
        assert_eq!(app.error.as_deref(), Some("division by zero"));
    }

    #[test]
    fn test_request_cancel_sets_flag_once() {
        let mut app = app();
        app.request_cancel();
        app.request_cancel();

        assert!(app.cancel.is_cancelled());
        let requests = app
            .log
            .iter()
            .filter(|l| l.contains("Cancellation requested"))
            .count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn test_cancel_after_settled_is_ignored() {
        let mut app = app();
        app.apply(WatchMessage::Finished(PollOutcome::Completed));
        app.request_cancel();

        assert!(!app.cancel.is_cancelled());
        assert!(!app.cancel_requested);
    }

    #[test]
    fn test_status_line() {
        let mut app = app();
        app.apply(WatchMessage::Status(Box::new(status(
            ExecutionState::Pending,
            Some(7),
        ))));

        let line = app.status_line();
        assert!(line.contains("pending"));
        assert!(line.contains("queue position 7"));
    }
}
