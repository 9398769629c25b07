//! Mock Dune API clients for testing.
//!
//! MockExecutionApi replays a scripted sequence of execution states so the
//! polling loop and command handlers can be tested without network access.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::models::{
    ExecutionError, ExecutionResponse, ExecutionResult, ExecutionState, ExecutionStatus,
    ExecutionTimes, PerformanceTier, QueryParameter, ResultMetadata, ResultsResponse,
};
use crate::api::ExecutionApi;
use crate::error::{DuneqError, Result};

/// Script describing how a mock execution should behave.
#[derive(Debug, Clone)]
pub struct ScriptedExecution {
    /// States returned by successive status calls; the last one repeats.
    pub states: Vec<ExecutionState>,
    /// Rows returned once the execution completes.
    pub rows: Vec<Map<String, Value>>,
    /// Failure message attached to a Failed state.
    pub error_message: Option<String>,
}

impl Default for ScriptedExecution {
    fn default() -> Self {
        Self {
            states: vec![ExecutionState::Executing, ExecutionState::Completed],
            rows: sample_rows(),
            error_message: None,
        }
    }
}

fn sample_rows() -> Vec<Map<String, Value>> {
    let rows = json!([
        {"blockchain": "ethereum", "trade_count": 1042},
        {"blockchain": "base", "trade_count": 77}
    ]);
    match rows {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect(),
        _ => unreachable!(),
    }
}

/// A mock API client that replays a scripted execution.
pub struct MockExecutionApi {
    script: Mutex<ScriptState>,
    /// Hours ago the latest cached result finished, for staleness tests.
    latest_age_hours: i64,
    started: Mutex<Vec<StartedExecution>>,
    cancel_calls: Mutex<Vec<String>>,
    status_calls: Mutex<u32>,
}

#[derive(Debug)]
struct ScriptState {
    pending: VecDeque<ExecutionState>,
    last: ExecutionState,
    rows: Vec<Map<String, Value>>,
    error_message: Option<String>,
    cancelled: bool,
}

/// Record of an execution started through the mock.
#[derive(Debug, Clone)]
pub struct StartedExecution {
    pub query_id: Option<u64>,
    pub sql: Option<String>,
    pub params: Vec<QueryParameter>,
    pub tier: PerformanceTier,
}

impl MockExecutionApi {
    /// Creates a mock that executes once and then completes.
    pub fn new() -> Self {
        Self::with_script(ScriptedExecution::default())
    }

    /// Creates a mock from an explicit script.
    pub fn with_script(script: ScriptedExecution) -> Self {
        let mut pending: VecDeque<ExecutionState> = script.states.into();
        let last = pending
            .pop_back()
            .unwrap_or(ExecutionState::Completed);
        pending.push_back(last);

        Self {
            script: Mutex::new(ScriptState {
                pending,
                last,
                rows: script.rows,
                error_message: script.error_message,
                cancelled: false,
            }),
            latest_age_hours: 1,
            started: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(0),
        }
    }

    /// Sets how old the latest cached result should appear to be.
    pub fn with_latest_age_hours(mut self, hours: i64) -> Self {
        self.latest_age_hours = hours;
        self
    }

    /// Executions started through this mock.
    pub fn started(&self) -> Vec<StartedExecution> {
        self.started.lock().unwrap().clone()
    }

    /// Execution ids passed to cancel_execution.
    pub fn cancel_calls(&self) -> Vec<String> {
        self.cancel_calls.lock().unwrap().clone()
    }

    /// Number of status calls made so far.
    pub fn status_call_count(&self) -> u32 {
        *self.status_calls.lock().unwrap()
    }

    fn next_state(&self) -> (ExecutionState, Option<String>) {
        let mut script = self.script.lock().unwrap();
        if script.cancelled {
            return (ExecutionState::Cancelled, None);
        }
        let state = match script.pending.len() {
            0 | 1 => script.last,
            _ => script.pending.pop_front().unwrap(),
        };
        let message = if state == ExecutionState::Failed {
            script.error_message.clone()
        } else {
            None
        };
        (state, message)
    }

    fn current_rows(&self) -> Vec<Map<String, Value>> {
        self.script.lock().unwrap().rows.clone()
    }

    fn results_for(&self, execution_id: &str, query_id: Option<u64>) -> ResultsResponse {
        let (state, message) = {
            let script = self.script.lock().unwrap();
            if script.cancelled {
                (ExecutionState::Cancelled, None)
            } else {
                (script.last, script.error_message.clone())
            }
        };

        let rows = if state == ExecutionState::Completed {
            self.current_rows()
        } else {
            Vec::new()
        };
        let column_names = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        let total = rows.len() as u64;

        ResultsResponse {
            execution_id: execution_id.to_string(),
            query_id,
            state,
            times: ExecutionTimes {
                submitted_at: Some(Utc::now()),
                execution_ended_at: Some(Utc::now() - ChronoDuration::hours(self.latest_age_hours)),
                ..Default::default()
            },
            result: Some(ExecutionResult {
                rows,
                metadata: ResultMetadata {
                    column_names,
                    total_row_count: Some(total),
                    datapoint_count: None,
                    execution_time_millis: Some(41),
                },
            }),
            error: message.map(|message| ExecutionError {
                error_type: None,
                message,
            }),
        }
    }
}

impl Default for MockExecutionApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionApi for MockExecutionApi {
    async fn execute_query(
        &self,
        query_id: u64,
        params: &[QueryParameter],
        tier: PerformanceTier,
    ) -> Result<ExecutionResponse> {
        self.started.lock().unwrap().push(StartedExecution {
            query_id: Some(query_id),
            sql: None,
            params: params.to_vec(),
            tier,
        });
        Ok(ExecutionResponse {
            execution_id: format!("mock-exec-{query_id}"),
            state: ExecutionState::Pending,
        })
    }

    async fn execute_sql(&self, sql: &str, tier: PerformanceTier) -> Result<ExecutionResponse> {
        self.started.lock().unwrap().push(StartedExecution {
            query_id: None,
            sql: Some(sql.to_string()),
            params: Vec::new(),
            tier,
        });
        Ok(ExecutionResponse {
            execution_id: "mock-exec-sql".to_string(),
            state: ExecutionState::Pending,
        })
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        *self.status_calls.lock().unwrap() += 1;
        let (state, message) = self.next_state();
        Ok(ExecutionStatus {
            execution_id: execution_id.to_string(),
            query_id: None,
            state,
            queue_position: if state == ExecutionState::Pending {
                Some(3)
            } else {
                None
            },
            times: ExecutionTimes {
                submitted_at: Some(Utc::now()),
                ..Default::default()
            },
            error: message.map(|message| ExecutionError {
                error_type: None,
                message,
            }),
        })
    }

    async fn get_execution_results(&self, execution_id: &str) -> Result<ResultsResponse> {
        Ok(self.results_for(execution_id, None))
    }

    async fn cancel_execution(&self, execution_id: &str) -> Result<bool> {
        self.cancel_calls
            .lock()
            .unwrap()
            .push(execution_id.to_string());
        self.script.lock().unwrap().cancelled = true;
        Ok(true)
    }

    async fn get_latest_results(&self, query_id: u64) -> Result<ResultsResponse> {
        Ok(self.results_for(&format!("mock-latest-{query_id}"), Some(query_id)))
    }
}

/// A mock client that fails every call with the same remote error.
pub struct FailingExecutionApi {
    message: String,
}

impl FailingExecutionApi {
    /// Creates a failing client with the given remote error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(DuneqError::execution(self.message.clone()))
    }
}

#[async_trait]
impl ExecutionApi for FailingExecutionApi {
    async fn execute_query(
        &self,
        _query_id: u64,
        _params: &[QueryParameter],
        _tier: PerformanceTier,
    ) -> Result<ExecutionResponse> {
        self.fail()
    }

    async fn execute_sql(&self, _sql: &str, _tier: PerformanceTier) -> Result<ExecutionResponse> {
        self.fail()
    }

    async fn get_execution_status(&self, _execution_id: &str) -> Result<ExecutionStatus> {
        self.fail()
    }

    async fn get_execution_results(&self, _execution_id: &str) -> Result<ResultsResponse> {
        self.fail()
    }

    async fn cancel_execution(&self, _execution_id: &str) -> Result<bool> {
        self.fail()
    }

    async fn get_latest_results(&self, _query_id: u64) -> Result<ResultsResponse> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_states_then_repeats_last() {
        let mock = MockExecutionApi::with_script(ScriptedExecution {
            states: vec![
                ExecutionState::Pending,
                ExecutionState::Executing,
                ExecutionState::Completed,
            ],
            ..Default::default()
        });

        let s1 = mock.get_execution_status("e").await.unwrap();
        let s2 = mock.get_execution_status("e").await.unwrap();
        let s3 = mock.get_execution_status("e").await.unwrap();
        let s4 = mock.get_execution_status("e").await.unwrap();

        assert_eq!(s1.state, ExecutionState::Pending);
        assert_eq!(s2.state, ExecutionState::Executing);
        assert_eq!(s3.state, ExecutionState::Completed);
        assert_eq!(s4.state, ExecutionState::Completed);
        assert_eq!(mock.status_call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_cancel_pins_state() {
        let mock = MockExecutionApi::new();
        mock.cancel_execution("e").await.unwrap();

        let status = mock.get_execution_status("e").await.unwrap();
        assert_eq!(status.state, ExecutionState::Cancelled);
        assert_eq!(mock.cancel_calls(), vec!["e"]);
    }

    #[tokio::test]
    async fn test_mock_records_started_executions() {
        let mock = MockExecutionApi::new();
        mock.execute_query(42, &[QueryParameter::text("a", "1")], PerformanceTier::Large)
            .await
            .unwrap();

        let started = mock.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].query_id, Some(42));
        assert_eq!(started[0].tier, PerformanceTier::Large);
    }

    #[tokio::test]
    async fn test_failing_client() {
        let failing = FailingExecutionApi::new("Query not found");
        let err = failing
            .get_latest_results(999)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Execution error: Query not found");
    }
}
