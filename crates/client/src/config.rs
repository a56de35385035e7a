//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TZM_API_BASE_URL` - Marketplace API root (default: `http://localhost:8000`)
//! - `TZM_STATE_DIR` - Directory for the persisted session and cart (default: `.tz-materials`)
//! - `TZM_REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout (default: 30)
//! - `TZM_REFRESH_LEAD_SECS` - Refresh this long before access token expiry (default: 30)
//! - `TZM_DELIVERY_METHOD` - Default delivery method for new orders (default: `pickup`)
//! - `TZM_PAYMENT_METHOD` - Default payment method (default: `mobile_money`)
//! - `TZM_PAYMENT_PROVIDER` - Default payment provider (default: `mpesa`)
//! - `TZM_PHONE` - Phone number used by `tzm auth login` when none is given
//! - `TZM_PASSWORD` - Password used by `tzm auth login` when none is given

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tz_materials_core::{DeliveryMethod, PaymentMethod, PaymentProvider};
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; request paths are joined onto it
    pub api_base_url: Url,
    /// Directory holding `tz-materials-auth.json` and `lmga-cart.json`
    pub state_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// How long before access token expiry the refresh fires
    pub refresh_lead: Duration,
    /// Checkout defaults
    pub checkout: CheckoutDefaults,
    /// Stored login credentials, if configured
    pub credentials: Option<LoginCredentials>,
}

/// Defaults applied to orders and payments created without explicit choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDefaults {
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub payment_provider: PaymentProvider,
}

impl Default for CheckoutDefaults {
    fn default() -> Self {
        Self {
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::MobileMoney,
            payment_provider: PaymentProvider::Mpesa,
        }
    }
}

/// Phone/password pair for non-interactive login.
///
/// `SecretString` keeps the password out of `Debug` output.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub phone: String,
    pub password: SecretString,
}

impl ClientConfig {
    /// Default API root.
    pub const DEFAULT_API_BASE_URL: &'static str = "http://localhost:8000";
    /// Default state directory.
    pub const DEFAULT_STATE_DIR: &'static str = ".tz-materials";

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value, or
    /// if only one of `TZM_PHONE`/`TZM_PASSWORD` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "TZM_API_BASE_URL",
            &get_env_or_default("TZM_API_BASE_URL", Self::DEFAULT_API_BASE_URL),
        )?;
        let state_dir = PathBuf::from(get_env_or_default("TZM_STATE_DIR", Self::DEFAULT_STATE_DIR));
        let request_timeout = Duration::from_secs(parse_env("TZM_REQUEST_TIMEOUT_SECS", "30")?);
        let refresh_lead = Duration::from_secs(parse_env("TZM_REFRESH_LEAD_SECS", "30")?);

        let checkout = CheckoutDefaults {
            delivery_method: parse_env("TZM_DELIVERY_METHOD", "pickup")?,
            payment_method: parse_env("TZM_PAYMENT_METHOD", "mobile_money")?,
            payment_provider: parse_env("TZM_PAYMENT_PROVIDER", "mpesa")?,
        };

        let credentials = match (get_optional_env("TZM_PHONE"), get_optional_env("TZM_PASSWORD")) {
            (Some(phone), Some(password)) => Some(LoginCredentials {
                phone,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("TZM_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("TZM_PHONE".to_string())),
        };

        Ok(Self {
            api_base_url,
            state_dir,
            request_timeout,
            refresh_lead,
            checkout,
            credentials,
        })
    }

    /// Configuration pointing at `api_base_url` with every other value at its
    /// default. Used by tests and embedders that do not read the environment.
    #[must_use]
    pub fn for_base_url(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            state_dir: PathBuf::from(Self::DEFAULT_STATE_DIR),
            request_timeout: Duration::from_secs(30),
            refresh_lead: Duration::from_secs(30),
            checkout: CheckoutDefaults::default(),
            credentials: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an API root, forcing a trailing slash so relative joins keep any
/// path prefix.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "not a base URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("K", "https://api.example.com/v2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/");
        assert_eq!(
            url.join("api/orders/").unwrap().as_str(),
            "https://api.example.com/v2/api/orders/"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        let err = parse_base_url("TZM_API_BASE_URL", "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TZM_API_BASE_URL"));

        assert!(parse_base_url("K", "mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_parse_env_uses_default_and_reports_key() {
        let lead: u64 = parse_env("TZM_TEST_UNSET_VARIABLE", "30").unwrap();
        assert_eq!(lead, 30);

        let err = parse_env::<DeliveryMethod>("TZM_TEST_UNSET_VARIABLE", "drone").unwrap_err();
        assert!(err.to_string().contains("TZM_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = ClientConfig::for_base_url(Url::parse("http://127.0.0.1:9/").unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_lead, Duration::from_secs(30));
        assert_eq!(config.checkout, CheckoutDefaults::default());
        assert!(config.credentials.is_none());
    }
}
