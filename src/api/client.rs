//! HTTP client for the Dune execution API.
//!
//! Implements the ExecutionApi trait against the v1 REST endpoints using
//! reqwest. Remote error messages are surfaced verbatim; no retries are
//! performed here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::api::models::{
    parameters_to_body, ExecutionResponse, ExecutionStatus, PerformanceTier, QueryParameter,
    ResultsResponse,
};
use crate::api::ExecutionApi;
use crate::config::ApiConfig;
use crate::error::{DuneqError, Result};

/// Default base URL of the Dune HTTP API.
const DEFAULT_API_URL: &str = "https://api.dune.com/api/v1";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-Dune-API-Key";

/// Dune client configuration.
#[derive(Debug, Clone)]
pub struct DuneClientConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL of the API.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl DuneClientConfig {
    /// Creates a new config with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Builds a client config from the file config plus a resolved key.
    pub fn from_config(api: &ApiConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api.api_url.clone(),
            timeout_secs: api.timeout_secs,
        }
    }
}

/// HTTP client for the Dune API.
#[derive(Debug, Clone)]
pub struct DuneClient {
    config: DuneClientConfig,
    client: Client,
}

impl DuneClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: DuneClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DuneqError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Maps a transport-level failure to a DuneqError.
    fn transport_error(e: reqwest::Error) -> DuneqError {
        if e.is_timeout() {
            DuneqError::network("Request timed out. Try again.")
        } else if e.is_connect() {
            DuneqError::network("Failed to connect to the Dune API. Check your network.")
        } else {
            DuneqError::network(format!("Request failed: {e}"))
        }
    }

    /// Parses an API error response, keeping the remote message verbatim.
    fn parse_error(status: StatusCode, body: &str) -> DuneqError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = remote_message(body)
                .unwrap_or_else(|| "invalid or missing API key".to_string());
            return DuneqError::auth(detail);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::PAYMENT_REQUIRED {
            let detail = remote_message(body)
                .unwrap_or_else(|| "rate limit or execution credits exceeded".to_string());
            return DuneqError::rate_limit(detail);
        }

        match remote_message(body) {
            Some(message) => DuneqError::execution(message),
            None => DuneqError::execution(format!("Dune API error ({status}): {body}")),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::read_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T> {
        let url = self.url(path);
        debug!("POST {url}");

        let mut request = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(Self::transport_error)?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DuneqError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| DuneqError::internal(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ExecutionApi for DuneClient {
    async fn execute_query(
        &self,
        query_id: u64,
        params: &[QueryParameter],
        tier: PerformanceTier,
    ) -> Result<ExecutionResponse> {
        let mut body = json!({ "performance": tier.as_str() });
        if !params.is_empty() {
            body["query_parameters"] = Value::Object(parameters_to_body(params));
        }

        self.post_json(&format!("query/{query_id}/execute"), Some(body))
            .await
    }

    async fn execute_sql(&self, sql: &str, tier: PerformanceTier) -> Result<ExecutionResponse> {
        let body = json!({
            "query_sql": sql,
            "performance": tier.as_str(),
        });

        self.post_json("query/execute", Some(body)).await
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        self.get_json(&format!("execution/{execution_id}/status"))
            .await
    }

    async fn get_execution_results(&self, execution_id: &str) -> Result<ResultsResponse> {
        self.get_json(&format!("execution/{execution_id}/results"))
            .await
    }

    async fn cancel_execution(&self, execution_id: &str) -> Result<bool> {
        let response: CancelResponse = self
            .post_json(&format!("execution/{execution_id}/cancel"), None)
            .await?;
        Ok(response.success)
    }

    async fn get_latest_results(&self, query_id: u64) -> Result<ResultsResponse> {
        self.get_json(&format!("query/{query_id}/results")).await
    }
}

/// Response to a cancellation request.
#[derive(Debug, serde::Deserialize)]
struct CancelResponse {
    #[serde(default)]
    success: bool,
}

/// Extracts the error message from an API error body, if one is present.
fn remote_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_defaults() {
        let config = DuneClientConfig::new("dqk_test");
        assert_eq!(config.api_key, "dqk_test");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_builders() {
        let config = DuneClientConfig::new("dqk_test")
            .with_api_url("http://localhost:8080/api/v1")
            .with_timeout(5);
        assert_eq!(config.api_url, "http://localhost:8080/api/v1");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = DuneClient::new(
            DuneClientConfig::new("k").with_api_url("https://api.dune.com/api/v1/"),
        )
        .unwrap();
        assert_eq!(
            client.url("query/42/execute"),
            "https://api.dune.com/api/v1/query/42/execute"
        );
    }

    #[test]
    fn test_parse_error_unauthorized() {
        let error = DuneClient::parse_error(StatusCode::UNAUTHORIZED, "");
        assert_eq!(error.category(), "Authentication Error");
    }

    #[test]
    fn test_parse_error_rate_limited() {
        let error = DuneClient::parse_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(error.category(), "Rate Limit Error");
    }

    #[test]
    fn test_parse_error_credits_exhausted() {
        let body = r#"{"error": "insufficient execution credits"}"#;
        let error = DuneClient::parse_error(StatusCode::PAYMENT_REQUIRED, body);
        assert!(error.to_string().contains("insufficient execution credits"));
    }

    #[test]
    fn test_parse_error_keeps_remote_message_verbatim() {
        let body = r#"{"error": "Query not found"}"#;
        let error = DuneClient::parse_error(StatusCode::NOT_FOUND, body);
        assert_eq!(error.to_string(), "Execution error: Query not found");
    }

    #[test]
    fn test_parse_error_nested_message() {
        let body = r#"{"error": {"type": "bad_request", "message": "invalid performance tier"}}"#;
        let error = DuneClient::parse_error(StatusCode::BAD_REQUEST, body);
        assert!(error.to_string().contains("invalid performance tier"));
    }

    #[test]
    fn test_parse_error_unstructured_body() {
        let error = DuneClient::parse_error(StatusCode::INTERNAL_SERVER_ERROR, "nope");
        assert!(error.to_string().contains("500"));
        assert!(error.to_string().contains("nope"));
    }

    #[test]
    fn test_remote_message_variants() {
        assert_eq!(
            remote_message(r#"{"error": "plain"}"#),
            Some("plain".to_string())
        );
        assert_eq!(
            remote_message(r#"{"error": {"message": "nested"}}"#),
            Some("nested".to_string())
        );
        assert_eq!(remote_message("not json"), None);
        assert_eq!(remote_message(r#"{"other": 1}"#), None);
    }
}
