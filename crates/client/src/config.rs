//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FRESHCART_API_URL` - Base URL of the commerce API (http or https)
//!
//! ## Optional
//! - `FRESHCART_SESSION_FILE` - Session file path (default: .freshcart/session.json)
//! - `FRESHCART_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `FRESHCART_STOCK_TTL_SECS` - Stock cache entry lifetime in seconds (default: 60)
//! - `FRESHCART_STOCK_CACHE_CAPACITY` - Maximum cached stock entries (default: 10000)
//! - `FRESHCART_CURRENCY` - ISO currency code for prices (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use freshcart_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_SESSION_FILE: &str = ".freshcart/session.json";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_STOCK_TTL_SECS: &str = "60";
const DEFAULT_STOCK_CAPACITY: &str = "10000";
const DEFAULT_CURRENCY: &str = "USD";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Commerce API configuration
    pub api: ApiConfig,
    /// Stock cache configuration
    pub stock: StockConfig,
    /// Where the session token and flags are persisted
    pub session_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths and image paths are appended to it.
    pub base_url: Url,
    pub timeout: Duration,
    /// Currency every price from this API is denominated in.
    pub currency: CurrencyCode,
}

impl ApiConfig {
    /// Config with default timeout and currency.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            currency: CurrencyCode::USD,
        }
    }
}

/// Stock cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct StockConfig {
    /// How long a looked-up stock level is trusted.
    pub ttl: Duration,
    pub capacity: u64,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 10_000,
        }
    }
}

impl ClientConfig {
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
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = parse_base_url(&get_required_env(&lookup, "FRESHCART_API_URL")?)?;
        let timeout = Duration::from_secs(parse_env(
            &lookup,
            "FRESHCART_HTTP_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let currency = parse_env(&lookup, "FRESHCART_CURRENCY", DEFAULT_CURRENCY)?;

        let ttl_secs: u64 = parse_env(&lookup, "FRESHCART_STOCK_TTL_SECS", DEFAULT_STOCK_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FRESHCART_STOCK_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let capacity = parse_env(
            &lookup,
            "FRESHCART_STOCK_CACHE_CAPACITY",
            DEFAULT_STOCK_CAPACITY,
        )?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                timeout,
                currency,
            },
            stock: StockConfig {
                ttl: Duration::from_secs(ttl_secs),
                capacity,
            },
            session_file: PathBuf::from(get_env_or_default(
                &lookup,
                "FRESHCART_SESSION_FILE",
                DEFAULT_SESSION_FILE,
            )),
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(lookup, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate the API base URL.
///
/// A trailing slash is added so relative endpoint paths join under it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("FRESHCART_API_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("FRESHCART_API_URL", "http://10.0.0.5:3000")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://10.0.0.5:3000/");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.api.currency, CurrencyCode::USD);
        assert_eq!(config.stock.ttl, Duration::from_secs(60));
        assert_eq!(config.stock.capacity, 10_000);
        assert_eq!(config.session_file, PathBuf::from(".freshcart/session.json"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "FRESHCART_API_URL"));
    }

    #[test]
    fn test_blank_api_url_is_missing() {
        let err = load(&[("FRESHCART_API_URL", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = load(&[("FRESHCART_API_URL", "ftp://example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_keeps_base_path() {
        let config = load(&[("FRESHCART_API_URL", "https://shop.example.com/api")]).unwrap();
        assert_eq!(
            config.api.base_url.join("checkmobile/login").unwrap().as_str(),
            "https://shop.example.com/api/checkmobile/login"
        );
    }

    #[test]
    fn test_zero_stock_ttl_rejected() {
        let err = load(&[
            ("FRESHCART_API_URL", "http://localhost:3000"),
            ("FRESHCART_STOCK_TTL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "FRESHCART_STOCK_TTL_SECS")
        );
    }

    #[test]
    fn test_invalid_timeout() {
        let err = load(&[
            ("FRESHCART_API_URL", "http://localhost:3000"),
            ("FRESHCART_HTTP_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("FRESHCART_API_URL", "http://localhost:3000/"),
            ("FRESHCART_CURRENCY", "vnd"),
            ("FRESHCART_SESSION_FILE", "/tmp/s.json"),
            ("FRESHCART_STOCK_CACHE_CAPACITY", "50"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ])
        .unwrap();
        assert_eq!(config.api.currency, CurrencyCode::VND);
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.stock.capacity, 50);
        assert!(config.sentry_dsn.is_some());
    }
}
