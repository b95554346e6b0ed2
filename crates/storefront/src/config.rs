//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VDIAMOND_API_URL` - Base URL of the storefront backend API
//!
//! ## Optional
//! - `VDIAMOND_DATA_DIR` - Directory for durable client state (default: .vdiamond)
//! - `VDIAMOND_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_DATA_DIR: &str = ".vdiamond";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DURABLE_STORE_FILE: &str = "durable.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually so the Sentry DSN (which embeds a key) is
/// never printed.
#[derive(Clone)]
pub struct StorefrontClientConfig {
    /// Backend API base URL. Request paths are resolved against it.
    pub api_url: Url,
    /// Directory holding the durable store file
    pub data_dir: PathBuf,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("data_dir", &self.data_dir)
            .field("request_timeout", &self.request_timeout)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontClientConfig {
    /// Configuration pointing at `api_url` with every optional setting at
    /// its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url("VDIAMOND_API_URL", &get_required_env("VDIAMOND_API_URL")?)?;
        let data_dir = PathBuf::from(get_env_or_default("VDIAMOND_DATA_DIR", DEFAULT_DATA_DIR));
        let timeout_secs = get_env_or_default(
            "VDIAMOND_REQUEST_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("VDIAMOND_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VDIAMOND_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Path of the durable store file inside `data_dir`.
    #[must_use]
    pub fn durable_store_path(&self) -> PathBuf {
        self.data_dir.join(DURABLE_STORE_FILE)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API base URL.
///
/// Only http(s) is accepted. A trailing slash is added so that relative
/// request paths join under the base path instead of replacing its last
/// segment.
fn parse_api_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
