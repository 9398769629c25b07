//! Dune API abstraction layer.
//!
//! Provides a trait-based interface over the execution endpoints so the
//! polling loop and command handlers can be exercised against a mock
//! client in tests.

mod client;
mod mock;
mod models;

pub use client::{DuneClient, DuneClientConfig};
pub use mock::{FailingExecutionApi, MockExecutionApi, ScriptedExecution};
pub use models::{
    parameters_to_body, ExecutionError, ExecutionResponse, ExecutionResult, ExecutionState,
    ExecutionStatus, ExecutionTimes, PerformanceTier, QueryParameter, QueryRequest, QueryTarget,
    ResultMetadata, ResultsResponse,
};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the Dune execution API surface used by duneq.
///
/// One method per remote operation; no retries beyond what the HTTP
/// client does internally.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Starts an execution of a saved query. Consumes execution credits
    /// at submission time.
    async fn execute_query(
        &self,
        query_id: u64,
        params: &[QueryParameter],
        tier: PerformanceTier,
    ) -> Result<ExecutionResponse>;

    /// Starts an execution of ad-hoc SQL. The provider may reject this
    /// for accounts without an elevated subscription tier.
    async fn execute_sql(&self, sql: &str, tier: PerformanceTier) -> Result<ExecutionResponse>;

    /// Fetches the current status of an execution.
    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus>;

    /// Fetches the results of an execution.
    async fn get_execution_results(&self, execution_id: &str) -> Result<ResultsResponse>;

    /// Requests cancellation of an execution. Returns whether the
    /// provider acknowledged the request.
    async fn cancel_execution(&self, execution_id: &str) -> Result<bool>;

    /// Fetches the latest cached results for a saved query without
    /// triggering a new execution. Consumes no credits.
    async fn get_latest_results(&self, query_id: u64) -> Result<ResultsResponse>;
}
