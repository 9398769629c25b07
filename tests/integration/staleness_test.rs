//! Staleness threshold behavior for cached latest results.

use std::sync::Arc;

use duneq::api::{ExecutionApi, ExecutionState, MockExecutionApi};
use duneq::commands;

#[tokio::test]
async fn fresh_results_pass_the_threshold() {
    let mock = Arc::new(MockExecutionApi::new().with_latest_age_hours(2));
    let results = commands::latest_results(mock, 42, Some(24)).await.unwrap();

    assert_eq!(results.state, ExecutionState::Completed);
    assert_eq!(results.row_count(), 2);
}

#[tokio::test]
async fn stale_results_error_without_triggering_a_run() {
    let mock = Arc::new(MockExecutionApi::new().with_latest_age_hours(48));

    let err = commands::latest_results(Arc::clone(&mock) as Arc<dyn ExecutionApi>, 42, Some(24))
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Stale Results");
    assert!(err.to_string().contains("48h old"));
    // The staleness check must never fall back to a fresh execution.
    assert!(mock.started().is_empty());
    assert!(mock.cancel_calls().is_empty());
}

#[tokio::test]
async fn zero_threshold_only_accepts_an_instant_result() {
    // Any positive age fails a zero-hour threshold, so a stale response
    // can never masquerade as the freshest available.
    let mock = Arc::new(MockExecutionApi::new().with_latest_age_hours(1));
    let err = commands::latest_results(mock, 42, Some(0)).await.unwrap_err();
    assert_eq!(err.category(), "Stale Results");
}

#[tokio::test]
async fn no_threshold_returns_results_of_any_age() {
    let mock = Arc::new(MockExecutionApi::new().with_latest_age_hours(2190));
    let results = commands::latest_results(mock, 42, None).await.unwrap();
    assert_eq!(results.row_count(), 2);
}
