//! Page client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_BASE_URL` - Absolute URL of the shop server (e.g., `https://shop.example.com`)
//!
//! ## Optional
//! - `SHOP_COOKIES` - Raw `Cookie` header carrying the session and `csrftoken` cookies
//! - `SHOP_AUTHENTICATED` - Whether the page session is signed in (default: false)
//! - `SHOP_STORAGE_PATH` - File backing the client-persisted store (default: .shop/local-storage.json)
//! - `SHOP_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".shop/local-storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Page client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Shop API connection settings
    pub api: ShopApiConfig,
    /// Whether the page session is signed in
    pub authenticated: bool,
    /// File backing the client-persisted store
    pub storage_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Shop API connection settings.
///
/// Implements `Debug` manually to redact the cookie header.
#[derive(Clone)]
pub struct ShopApiConfig {
    /// Base URL all API paths are joined onto
    pub base_url: Url,
    /// Raw `Cookie` header (session id and CSRF token)
    pub cookies: Option<SecretString>,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for ShopApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("cookies", &self.cookies.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ShopApiConfig {
    /// Settings for a server at `base_url` with no cookies and no timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            cookies: None,
            request_timeout: None,
        }
    }

    /// Attach a raw `Cookie` header.
    #[must_use]
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(SecretString::from(cookies.into()));
        self
    }
}

impl StorefrontConfig {
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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = required(&lookup, "SHOP_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOP_BASE_URL".to_string(), e.to_string())
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "SHOP_BASE_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let authenticated = match lookup("SHOP_AUTHENTICATED") {
            Some(value) => parse_bool("SHOP_AUTHENTICATED", &value)?,
            None => false,
        };

        let request_timeout = lookup("SHOP_REQUEST_TIMEOUT_SECS")
            .map(|value| {
                value.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar("SHOP_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let storage_path = lookup("SHOP_STORAGE_PATH")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);

        Ok(Self {
            api: ShopApiConfig {
                base_url,
                cookies: lookup("SHOP_COOKIES")
                    .filter(|value| !value.trim().is_empty())
                    .map(SecretString::from),
                request_timeout,
            },
            authenticated,
            storage_path,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
