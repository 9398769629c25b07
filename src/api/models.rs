//! Wire types for the Dune execution API.
//!
//! These mirror the JSON payloads returned by the v1 endpoints. Unknown
//! fields are ignored so provider-side additions do not break parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Execution performance tier. Larger tiers consume more credits per run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    #[default]
    Medium,
    Large,
}

impl PerformanceTier {
    /// Returns the tier as the string the API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a query execution as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    #[serde(rename = "QUERY_STATE_PENDING")]
    Pending,
    #[serde(rename = "QUERY_STATE_EXECUTING")]
    Executing,
    #[serde(rename = "QUERY_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "QUERY_STATE_FAILED")]
    Failed,
    #[serde(rename = "QUERY_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "QUERY_STATE_EXPIRED")]
    Expired,
}

impl ExecutionState {
    /// Returns true once the execution can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    /// Human-readable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named query parameter. The API currently only distinguishes types on
/// the query definition side, so all values travel as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: String,
}

impl QueryParameter {
    /// Creates a text parameter.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Builds the `query_parameters` request-body object from a parameter list.
pub fn parameters_to_body(params: &[QueryParameter]) -> Map<String, Value> {
    params
        .iter()
        .map(|p| (p.name.clone(), Value::String(p.value.clone())))
        .collect()
}

/// A query submission: either a saved query id or ad-hoc SQL, plus
/// parameters and the performance tier. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub target: QueryTarget,
    pub params: Vec<QueryParameter>,
    pub tier: PerformanceTier,
}

/// What a request executes: a saved query or raw SQL.
#[derive(Debug, Clone)]
pub enum QueryTarget {
    Saved(u64),
    Sql(String),
}

impl QueryRequest {
    /// Creates a request for a saved query.
    pub fn saved(query_id: u64, params: Vec<QueryParameter>, tier: PerformanceTier) -> Self {
        Self {
            target: QueryTarget::Saved(query_id),
            params,
            tier,
        }
    }

    /// Creates a request for ad-hoc SQL.
    pub fn sql(sql: impl Into<String>, tier: PerformanceTier) -> Self {
        Self {
            target: QueryTarget::Sql(sql.into()),
            params: Vec::new(),
            tier,
        }
    }
}

/// Response to starting an execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    pub execution_id: String,
    pub state: ExecutionState,
}

/// Timestamps attached to an execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTimes {
    pub submitted_at: Option<DateTime<Utc>>,
    pub execution_started_at: Option<DateTime<Utc>>,
    pub execution_ended_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Error details for a failed execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: String,
}

/// Status snapshot of an execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatus {
    pub execution_id: String,
    #[serde(default)]
    pub query_id: Option<u64>,
    pub state: ExecutionState,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(flatten)]
    pub times: ExecutionTimes,
    #[serde(default)]
    pub error: Option<ExecutionError>,
}

impl ExecutionStatus {
    /// The failure message, if the execution failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Metadata describing a result set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultMetadata {
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub total_row_count: Option<u64>,
    #[serde(default)]
    pub datapoint_count: Option<u64>,
    #[serde(default)]
    pub execution_time_millis: Option<u64>,
}

/// Rows plus metadata for a completed execution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl ExecutionResult {
    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names, falling back to the first row's keys when the
    /// metadata omits them.
    pub fn column_names(&self) -> Vec<String> {
        if !self.metadata.column_names.is_empty() {
            return self.metadata.column_names.clone();
        }
        self.rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Full results payload for an execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsResponse {
    pub execution_id: String,
    #[serde(default)]
    pub query_id: Option<u64>,
    pub state: ExecutionState,
    #[serde(flatten)]
    pub times: ExecutionTimes,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    #[serde(default)]
    pub error: Option<ExecutionError>,
}

impl ResultsResponse {
    /// Number of rows in the payload (zero when no result is attached).
    pub fn row_count(&self) -> usize {
        self.result.as_ref().map(|r| r.rows.len()).unwrap_or(0)
    }
}
