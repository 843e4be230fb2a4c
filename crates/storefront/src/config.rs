//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `JUNIPER_API_BASE_URL` - Backend API base URL
//!   (default: `https://localhost:7200/api/v1`)
//! - `JUNIPER_DATA_DIR` - Directory for client-local state
//!   (default: `.juniper`)
//! - `JUNIPER_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds
//!   (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://localhost:7200/api/v1";
const DEFAULT_DATA_DIR: &str = ".juniper";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// File name of the durable key-value area (credential, cart).
const DURABLE_STORE_FILE: &str = "storefront.json";
/// File name of the session-scoped area (checkout draft).
const SESSION_STORE_FILE: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API base URL (all endpoint paths are joined onto this).
    pub api_base_url: Url,
    /// Directory holding client-local state files.
    pub data_dir: PathBuf,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_env_or_default(
            "JUNIPER_API_BASE_URL",
            DEFAULT_API_BASE_URL,
        ))?;
        let data_dir = PathBuf::from(get_env_or_default("JUNIPER_DATA_DIR", DEFAULT_DATA_DIR));
        let timeout_secs = get_env_or_default(
            "JUNIPER_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("JUNIPER_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Path of the durable key-value area.
    #[must_use]
    pub fn durable_store_path(&self) -> PathBuf {
        self.data_dir.join(DURABLE_STORE_FILE)
    }

    /// Path of the session-scoped key-value area.
    #[must_use]
    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_STORE_FILE)
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL is valid"),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("JUNIPER_API_BASE_URL".to_string(), e.to_string()))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "JUNIPER_API_BASE_URL".to_string(),
            "URL must have a host".to_string(),
        ));
    }

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEnvVar(
            "JUNIPER_API_BASE_URL".to_string(),
            format!("unsupported scheme: {other}"),
        )),
    }
}
