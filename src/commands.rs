//! Command handlers.
//!
//! Each handler composes the API client, the polling loop, and the
//! renderer into one user-facing operation. Handlers take the API as a
//! trait object so they can run against the mock client in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::{
    ExecutionApi, ExecutionResponse, ExecutionStatus, PerformanceTier, QueryParameter,
    QueryRequest, QueryTarget, ResultsResponse,
};
use crate::error::{DuneqError, Result};
use crate::params;
use crate::poll::{CancelFlag, ExecutionHandle, PollOutcome, Poller};

/// Options shared by the waiting commands.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tier: PerformanceTier,
    pub poll_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl RunOptions {
    fn poller(&self, api: Arc<dyn ExecutionApi>) -> Poller {
        Poller::new(api, self.poll_interval, self.max_wait)
    }
}

/// Submits a request, dispatching on its target.
///
/// The request is borrowed immutably: once submitted it never changes.
pub async fn submit(
    api: &Arc<dyn ExecutionApi>,
    request: &QueryRequest,
) -> Result<ExecutionResponse> {
    let response = match &request.target {
        QueryTarget::Saved(query_id) => {
            api.execute_query(*query_id, &request.params, request.tier)
                .await?
        }
        QueryTarget::Sql(sql) => api.execute_sql(sql, request.tier).await?,
    };
    info!("Execution {} started", response.execution_id);
    Ok(response)
}

/// Runs a saved query to completion and returns its results.
///
/// Submits the execution, polls until terminal, then fetches results.
/// Consumes execution credits at submission time.
pub async fn run_query(
    api: Arc<dyn ExecutionApi>,
    query_id: u64,
    parameters: &[QueryParameter],
    opts: &RunOptions,
    cancel: &CancelFlag,
) -> Result<ResultsResponse> {
    let request = QueryRequest::saved(query_id, parameters.to_vec(), opts.tier);
    let response = submit(&api, &request).await?;
    wait_for_results(api, &response.execution_id, opts, cancel).await
}

/// Runs ad-hoc SQL to completion and returns its results.
///
/// The provider may reject the submission for accounts without an
/// elevated subscription tier; that error is surfaced verbatim.
pub async fn run_sql(
    api: Arc<dyn ExecutionApi>,
    sql: &str,
    opts: &RunOptions,
    cancel: &CancelFlag,
) -> Result<ResultsResponse> {
    let request = QueryRequest::sql(sql, opts.tier);
    let response = submit(&api, &request).await?;
    wait_for_results(api, &response.execution_id, opts, cancel).await
}

/// Starts an async execution of a saved query and returns immediately.
pub async fn start_query(
    api: Arc<dyn ExecutionApi>,
    query_id: u64,
    parameters: &[QueryParameter],
    tier: PerformanceTier,
) -> Result<ExecutionResponse> {
    let request = QueryRequest::saved(query_id, parameters.to_vec(), tier);
    submit(&api, &request).await
}

/// Starts an async execution of ad-hoc SQL and returns immediately.
pub async fn start_sql(
    api: Arc<dyn ExecutionApi>,
    sql: &str,
    tier: PerformanceTier,
) -> Result<ExecutionResponse> {
    let request = QueryRequest::sql(sql, tier);
    submit(&api, &request).await
}

/// Substitutes `--param` values into ad-hoc SQL, failing when a
/// placeholder has no value.
pub fn prepare_sql(sql: &str, param_flags: &[String]) -> Result<String> {
    let values: HashMap<String, String> = params::parse_param_flags(param_flags)?;

    let missing = params::missing_parameters(sql, &values);
    if !missing.is_empty() {
        return Err(DuneqError::config(format!(
            "Missing values for: {}. Pass --param name=value.",
            missing.join(", ")
        )));
    }

    Ok(params::substitute_parameters(sql, &values))
}

/// Builds the parameter list for a saved query from `--param` flags.
pub fn prepare_parameters(param_flags: &[String]) -> Result<Vec<QueryParameter>> {
    let values = params::parse_param_flags(param_flags)?;
    Ok(params::build_parameters(&values))
}

/// Waits for an execution to finish and fetches its results.
pub async fn wait_for_results(
    api: Arc<dyn ExecutionApi>,
    execution_id: &str,
    opts: &RunOptions,
    cancel: &CancelFlag,
) -> Result<ResultsResponse> {
    let poller = opts.poller(api.clone());
    let mut handle = ExecutionHandle::new(execution_id);

    let outcome = poller.wait(&mut handle, cancel, log_tick).await?;

    match outcome {
        PollOutcome::Completed => api.get_execution_results(execution_id).await,
        PollOutcome::Failed(message) => Err(DuneqError::execution(message)),
        PollOutcome::Cancelled => Err(DuneqError::execution(format!(
            "Execution {execution_id} was cancelled"
        ))),
        PollOutcome::Expired => Err(DuneqError::execution(format!(
            "Execution {execution_id} expired before results were fetched"
        ))),
        PollOutcome::TimedOut => Err(DuneqError::execution(format!(
            "Gave up waiting for execution {execution_id}. \
             It may still be running; check it with `duneq watch {execution_id}`."
        ))),
    }
}

fn log_tick(status: &ExecutionStatus) {
    match status.queue_position {
        Some(position) => info!(
            "Execution {} is {} (queue position {position})",
            status.execution_id, status.state
        ),
        None => info!("Execution {} is {}", status.execution_id, status.state),
    }
}

/// Fetches the latest cached results for a query, enforcing a staleness
/// threshold on the client side.
///
/// Never triggers a new execution and never consumes credits: results
/// older than the threshold are an error, not a re-run.
pub async fn latest_results(
    api: Arc<dyn ExecutionApi>,
    query_id: u64,
    max_age_hours: Option<u64>,
) -> Result<ResultsResponse> {
    let results = api.get_latest_results(query_id).await?;

    if let Some(max_age_hours) = max_age_hours {
        let ended = results.times.execution_ended_at.ok_or_else(|| {
            DuneqError::stale(format!(
                "Query {query_id} has no completed execution to take results from"
            ))
        })?;

        let age = chrono::Utc::now() - ended;
        let threshold = chrono::Duration::hours(max_age_hours as i64);
        if age > threshold {
            return Err(DuneqError::stale(format!(
                "Latest results for query {query_id} are {}h old; threshold is {max_age_hours}h. \
                 Re-run the query to refresh them.",
                age.num_hours()
            )));
        }
    }

    Ok(results)
}

/// Fetches the status of an execution.
pub async fn execution_status(
    api: Arc<dyn ExecutionApi>,
    execution_id: &str,
) -> Result<ExecutionStatus> {
    api.get_execution_status(execution_id).await
}

/// Fetches the results of an execution without waiting.
pub async fn execution_results(
    api: Arc<dyn ExecutionApi>,
    execution_id: &str,
) -> Result<ResultsResponse> {
    api.get_execution_results(execution_id).await
}

/// Requests cancellation of an execution.
pub async fn cancel_execution(api: Arc<dyn ExecutionApi>, execution_id: &str) -> Result<bool> {
    api.cancel_execution(execution_id).await
}
