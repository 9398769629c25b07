//! API key resolution and secure storage.
//!
//! The key is resolved first-non-empty-wins: user-entered value (CLI flag),
//! then the DUNE_API_KEY environment variable, then the OS keyring, then
//! the config file. Keyring storage falls back gracefully when no keyring
//! backend is available.

use crate::config::Config;
use crate::error::{DuneqError, Result};
use keyring::Entry;
use tracing::warn;

const SERVICE_NAME: &str = "duneq";
const KEYRING_USER: &str = "api-key";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "DUNE_API_KEY";

/// Resolves the API key to use for this invocation.
///
/// `flag` carries a user-entered value, which always wins.
pub fn resolve_api_key(flag: Option<&str>, config: &Config) -> Result<String> {
    if let Some(key) = non_empty(flag.map(str::to_string)) {
        return Ok(key);
    }

    if let Some(key) = non_empty(std::env::var(API_KEY_ENV).ok()) {
        return Ok(key);
    }

    if let Some(key) = non_empty(ApiKeyStore::new().retrieve()?) {
        return Ok(key);
    }

    if let Some(key) = non_empty(config.api.api_key.clone()) {
        return Ok(key);
    }

    Err(DuneqError::auth(format!(
        "No API key found. Pass --api-key, set {API_KEY_ENV}, or run `duneq key set`."
    )))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Secure storage for the Dune API key, backed by the OS keyring.
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    keyring_available: bool,
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStore {
    /// Creates a new store, probing keyring availability.
    pub fn new() -> Self {
        Self {
            keyring_available: Self::probe_keyring(),
        }
    }

    /// Probes whether the OS keyring is available.
    fn probe_keyring() -> bool {
        let test_entry = match Entry::new(SERVICE_NAME, "__probe__") {
            Ok(e) => e,
            Err(_) => return false,
        };

        match test_entry.set_password("test") {
            Ok(()) => {
                let _ = test_entry.delete_credential();
                true
            }
            Err(_) => false,
        }
    }

    /// Returns whether secure storage is available.
    pub fn is_secure(&self) -> bool {
        self.keyring_available
    }

    /// Stores the API key in the keyring.
    pub fn store(&self, key: &str) -> Result<()> {
        if !self.keyring_available {
            return Err(DuneqError::config(
                "OS keyring unavailable. Set the key via DUNE_API_KEY or the config file instead.",
            ));
        }

        let entry = Entry::new(SERVICE_NAME, KEYRING_USER)
            .map_err(|e| DuneqError::internal(format!("Failed to create keyring entry: {e}")))?;

        entry
            .set_password(key)
            .map_err(|e| DuneqError::internal(format!("Failed to store API key: {e}")))?;

        Ok(())
    }

    /// Retrieves the API key from the keyring, if present.
    pub fn retrieve(&self) -> Result<Option<String>> {
        if !self.keyring_available {
            return Ok(None);
        }

        let entry = Entry::new(SERVICE_NAME, KEYRING_USER)
            .map_err(|e| DuneqError::internal(format!("Failed to access keyring: {e}")))?;

        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(DuneqError::internal(format!(
                "Failed to retrieve API key: {e}"
            ))),
        }
    }

    /// Deletes the stored API key. Missing entries are not an error.
    pub fn delete(&self) -> Result<()> {
        if !self.keyring_available {
            return Ok(());
        }

        let entry = Entry::new(SERVICE_NAME, KEYRING_USER)
            .map_err(|e| DuneqError::internal(format!("Failed to access keyring: {e}")))?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete API key from keyring: {e}");
                Ok(())
            }
        }
    }
}

/// Masks a secret for display, showing only the last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    if secret.len() <= 4 {
        "*".repeat(secret.len())
    } else {
        format!("{}...{}", "*".repeat(4), &secret[secret.len() - 4..])
    }
}
