//! Error types for duneq.
//!
//! Defines the main error enum used throughout the application. Variants
//! mirror the failure surface of the Dune API: auth, remote execution,
//! rate/credit limits, staleness, and plain network trouble.

use thiserror::Error;

/// Main error type for duneq operations.
#[derive(Error, Debug)]
pub enum DuneqError {
    /// Missing or invalid API key.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote execution errors (query failed, unknown query id, bad SQL, etc.)
    /// The provider's message is carried verbatim.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Rate limit or execution credit exhaustion.
    #[error("Rate limit error: {0}")]
    RateLimit(String),

    /// Cached results exist but are older than the requested threshold.
    #[error("Stale results: {0}")]
    Stale(String),

    /// Network-level errors (connect failures, timeouts).
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors (invalid config file, bad flag values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DuneqError {
    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a rate limit error with the given message.
    pub fn rate_limit(msg: impl Into<String>) -> Self {
        Self::RateLimit(msg.into())
    }

    /// Creates a staleness error with the given message.
    pub fn stale(msg: impl Into<String>) -> Self {
        Self::Stale(msg.into())
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) => "Authentication Error",
            Self::Execution(_) => "Execution Error",
            Self::RateLimit(_) => "Rate Limit Error",
            Self::Stale(_) => "Stale Results",
            Self::Network(_) => "Network Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the error came from the remote side (as opposed to
    /// local configuration or plumbing).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Execution(_) | Self::RateLimit(_) | Self::Auth(_)
        )
    }
}

/// Result type alias using DuneqError.
pub type Result<T> = std::result::Result<T, DuneqError>;
