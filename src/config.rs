//! Configuration management for duneq.
//!
//! Handles loading configuration from TOML files and environment variables:
//! API endpoint settings plus the defaults used by the polling loop and the
//! result renderer.

use crate::error::{DuneqError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::PerformanceTier;

/// Main configuration structure for duneq.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Dune API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Defaults applied when the corresponding CLI flag is absent.
    #[serde(default)]
    pub defaults: Defaults,
}

/// Dune API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Dune HTTP API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API key (not recommended to store in config; prefer the keyring
    /// or the DUNE_API_KEY environment variable).
    pub api_key: Option<String>,
}

fn default_api_url() -> String {
    "https://api.dune.com/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

/// Defaults for polling and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Execution performance tier sent with new executions.
    #[serde(default)]
    pub performance: PerformanceTier,

    /// Seconds between status checks while waiting on an execution.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum seconds to wait for completion; None waits until the user
    /// cancels.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: Option<u64>,

    /// Maximum rows shown in rendered tables. Exports are never capped.
    #[serde(default = "default_max_display_rows")]
    pub max_display_rows: usize,
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_max_wait_secs() -> Option<u64> {
    Some(300)
}

fn default_max_display_rows() -> usize {
    1000
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            performance: PerformanceTier::default(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            max_display_rows: default_max_display_rows(),
        }
    }
}

impl Defaults {
    /// Poll interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Max wait as a Duration, if bounded.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duneq")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the built-in defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DuneqError::config(format!("Failed to read config file: {e}")))?;

        let config = Self::parse_toml(&content, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            DuneqError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Validates field values that serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.api_url)
            .map_err(|e| DuneqError::config(format!("Invalid api_url '{}': {e}", self.api.api_url)))?;

        if self.api.timeout_secs == 0 {
            return Err(DuneqError::config("timeout_secs must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[api]
api_url = "https://api.dune.com/api/v1"
timeout_secs = 60

[defaults]
performance = "large"
poll_interval_secs = 5
max_wait_secs = 600
max_display_rows = 200
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.api_url, "https://api.dune.com/api/v1");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.defaults.performance, PerformanceTier::Large);
        assert_eq!(config.defaults.poll_interval_secs, 5);
        assert_eq!(config.defaults.max_wait_secs, Some(600));
        assert_eq!(config.defaults.max_display_rows, 200);
    }

    #[test]
    fn test_missing_optional_fields() {
        let toml = r#"
[api]
timeout_secs = 15
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.api_url, "https://api.dune.com/api/v1");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.api.api_key, None);
        assert_eq!(config.defaults.performance, PerformanceTier::Medium);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.api_url, "https://api.dune.com/api/v1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.defaults.poll_interval_secs, 3);
        assert_eq!(config.defaults.max_wait_secs, Some(300));
        assert_eq!(config.defaults.max_display_rows, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.api.api_url = "not a url".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid api_url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_floor() {
        let defaults = Defaults {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(defaults.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/duneq.toml")).unwrap();
        assert_eq!(config.api.api_url, "https://api.dune.com/api/v1");
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[defaults]
max_display_rows = 50
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.defaults.max_display_rows, 50);
    }
}
