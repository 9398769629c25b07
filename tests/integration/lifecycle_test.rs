//! End-to-end execution lifecycle tests against the mock client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use duneq::api::{
    ExecutionApi, ExecutionState, FailingExecutionApi, MockExecutionApi, PerformanceTier,
    QueryParameter, ScriptedExecution,
};
use duneq::commands::{self, RunOptions};
use duneq::poll::{CancelFlag, ExecutionHandle, PollOutcome, Poller, Sleeper};

fn opts() -> RunOptions {
    RunOptions {
        tier: PerformanceTier::Medium,
        poll_interval: Duration::ZERO,
        max_wait: Some(Duration::from_secs(120)),
    }
}

/// Sleeper that trips the cancel flag after a set number of sleeps,
/// simulating a user pressing cancel mid-poll.
struct CancellingSleeper {
    cancel: CancelFlag,
    after: Mutex<u32>,
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        let mut remaining = self.after.lock().unwrap();
        if *remaining == 0 {
            self.cancel.cancel();
        } else {
            *remaining -= 1;
        }
    }
}

#[tokio::test]
async fn run_query_full_lifecycle() {
    let mock = Arc::new(MockExecutionApi::with_script(ScriptedExecution {
        states: vec![
            ExecutionState::Pending,
            ExecutionState::Executing,
            ExecutionState::Completed,
        ],
        ..Default::default()
    }));

    let params = [QueryParameter::text("blockchain", "ethereum")];
    let results = commands::run_query(
        Arc::clone(&mock) as Arc<dyn ExecutionApi>,
        1215383,
        &params,
        &opts(),
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(results.state, ExecutionState::Completed);
    assert_eq!(results.row_count(), 2);

    let started = mock.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].query_id, Some(1215383));
    assert_eq!(started[0].params, params);
}

#[tokio::test]
async fn invalid_query_id_surfaces_remote_message_and_leaves_session_usable() {
    let failing = Arc::new(FailingExecutionApi::new("Query not found"));

    let err = commands::run_query(
        Arc::clone(&failing) as Arc<dyn ExecutionApi>,
        999999,
        &[],
        &opts(),
        &CancelFlag::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Execution error: Query not found");

    // A second submission on the same client still works end to end.
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::run_query(
        Arc::clone(&mock) as Arc<dyn ExecutionApi>,
        42,
        &[],
        &opts(),
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(results.state, ExecutionState::Completed);
}

#[tokio::test]
async fn cancel_mid_poll_sends_one_cancel_and_stops_polling() {
    let mock = Arc::new(MockExecutionApi::with_script(ScriptedExecution {
        states: vec![ExecutionState::Executing],
        ..Default::default()
    }));

    let cancel = CancelFlag::new();
    let poller = Poller::with_sleeper(
        Arc::clone(&mock) as Arc<dyn ExecutionApi>,
        Duration::from_secs(3),
        None,
        Box::new(CancellingSleeper {
            cancel: cancel.clone(),
            after: Mutex::new(2),
        }),
    );

    let mut handle = ExecutionHandle::new("e-cancel");
    let outcome = poller.wait(&mut handle, &cancel, |_| {}).await.unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(handle.state(), ExecutionState::Cancelled);
    assert_eq!(mock.cancel_calls(), vec!["e-cancel"]);
    // Three status checks happened before the flag tripped.
    assert_eq!(mock.status_call_count(), 3);
}

#[tokio::test]
async fn cancelled_handle_stays_cancelled() {
    let mut handle = ExecutionHandle::new("e");
    assert!(handle.transition(ExecutionState::Executing));
    assert!(handle.transition(ExecutionState::Cancelled));

    // No later observation may complete a cancelled execution.
    assert!(!handle.transition(ExecutionState::Completed));
    assert!(!handle.transition(ExecutionState::Failed));
    assert_eq!(handle.state(), ExecutionState::Cancelled);
}

#[tokio::test]
async fn sql_execution_failure_is_verbatim() {
    let mock = Arc::new(MockExecutionApi::with_script(ScriptedExecution {
        states: vec![ExecutionState::Pending, ExecutionState::Failed],
        error_message: Some("line 1:8: Column 'wallet' cannot be resolved".to_string()),
        ..Default::default()
    }));

    let err = commands::run_sql(
        Arc::clone(&mock) as Arc<dyn ExecutionApi>,
        "SELECT wallet FROM dex.trades",
        &opts(),
        &CancelFlag::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Execution error: line 1:8: Column 'wallet' cannot be resolved"
    );
}

#[tokio::test]
async fn exhausted_wait_budget_reports_timeout() {
    let mock = Arc::new(MockExecutionApi::with_script(ScriptedExecution {
        states: vec![ExecutionState::Executing],
        ..Default::default()
    }));

    let opts = RunOptions {
        tier: PerformanceTier::Medium,
        poll_interval: Duration::from_millis(1),
        max_wait: Some(Duration::from_millis(3)),
    };

    let err = commands::wait_for_results(
        Arc::clone(&mock) as Arc<dyn ExecutionApi>,
        "e-slow",
        &opts,
        &CancelFlag::new(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("Gave up waiting"));
    // Timing out must not cancel the remote execution.
    assert!(mock.cancel_calls().is_empty());
}
