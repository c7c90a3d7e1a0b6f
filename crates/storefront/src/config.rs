//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session store
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `FIRESTORE_PROJECT_ID` - Google Cloud project holding the order documents
//! - `STRIPE_SECRET_KEY` - Stripe secret API key (high entropy, not a placeholder)
//! - `CATALOG_API_URL` - Base URL of the product catalog API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Whole-request timeout (default: 30)
//! - `FIRESTORE_DATABASE_ID` - Firestore database (default: `(default)`)
//! - `FIRESTORE_ACCESS_TOKEN` - OAuth bearer token for the Firestore REST API
//! - `FIRESTORE_EMULATOR_HOST` - `host:port` of a local emulator; overrides the API base
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `ORDER_HISTORY_STORE_TIMEOUT_MS` - Order store query timeout (default: 5000)
//! - `ORDER_HISTORY_PROVIDER_TIMEOUT_MS` - Per line-item call timeout (default: 5000)
//! - `ORDER_HISTORY_MAX_CONCURRENCY` - In-flight line-item calls for large histories (default: 10)
//! - `ORDER_HISTORY_UNBOUNDED_UP_TO` - Histories up to this size fan out fully (default: 20)
//! - `ORDER_HISTORY_FAILURE_POLICY` - `isolate` or `fail-fast` (default: isolate)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::orders::{FailurePolicy, OrderHistorySettings};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com";
const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Upper bound on a whole request
    pub request_timeout: Duration,
    /// Order store (Firestore) configuration
    pub firestore: FirestoreConfig,
    /// Line-item provider (Stripe) configuration
    pub stripe: StripeConfig,
    /// Product catalog configuration
    pub catalog: CatalogConfig,
    /// Order history fan-out settings
    pub order_history: OrderHistorySettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Firestore REST API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct FirestoreConfig {
    /// API base URL, without a trailing slash
    pub api_base: String,
    /// Google Cloud project id
    pub project_id: String,
    /// Database id within the project
    pub database_id: String,
    /// OAuth bearer token; the emulator accepts requests without one
    pub access_token: Option<SecretString>,
    /// HTTP client timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("api_base", &self.api_base)
            .field("project_id", &self.project_id)
            .field("database_id", &self.database_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// API base URL, without a trailing slash
    pub api_base: String,
    /// Secret API key
    pub secret_key: SecretString,
    /// HTTP client timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Product catalog API configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    pub api_url: Url,
    /// How long a fetched listing is served from memory
    pub cache_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_parsed_or_default("STOREFRONT_PORT", 3000_u16)?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let request_timeout =
            Duration::from_secs(get_parsed_or_default("STOREFRONT_REQUEST_TIMEOUT_SECS", 30)?);

        let order_history = order_history_from_env()?;
        let firestore = FirestoreConfig::from_env(order_history.store_timeout)?;
        let stripe = StripeConfig::from_env(order_history.provider_timeout)?;
        let catalog = CatalogConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            request_timeout,
            firestore,
            stripe,
            catalog,
            order_history,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FirestoreConfig {
    /// Load Firestore settings; `timeout` bounds each HTTP request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `FIRESTORE_PROJECT_ID` is missing.
    pub fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let api_base = get_optional_env("FIRESTORE_EMULATOR_HOST").map_or_else(
            || FIRESTORE_API_BASE.to_string(),
            |host| format!("http://{host}"),
        );

        Ok(Self {
            api_base,
            project_id: get_required_env("FIRESTORE_PROJECT_ID")?,
            database_id: get_env_or_default("FIRESTORE_DATABASE_ID", "(default)"),
            access_token: get_optional_env("FIRESTORE_ACCESS_TOKEN").map(SecretString::from),
            timeout,
        })
    }

    /// Returns the documents root, e.g.
    /// `https://firestore.googleapis.com/v1/projects/p/databases/(default)/documents`.
    #[must_use]
    pub fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            self.api_base.trim_end_matches('/'),
            self.project_id,
            self.database_id
        )
    }
}

impl StripeConfig {
    /// Load Stripe settings; `timeout` bounds each HTTP request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `STRIPE_SECRET_KEY` is missing or looks like a
    /// placeholder.
    pub fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("STRIPE_API_BASE", STRIPE_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            timeout,
        })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("CATALOG_API_URL")?;
        let api_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("CATALOG_API_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_url,
            cache_ttl: Duration::from_secs(300),
        })
    }
}

/// Load the order history fan-out settings, defaulting every unset variable.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set but cannot be parsed.
pub fn order_history_from_env() -> Result<OrderHistorySettings, ConfigError> {
    let defaults = OrderHistorySettings::default();

    let max_concurrency = get_parsed_or_default(
        "ORDER_HISTORY_MAX_CONCURRENCY",
        defaults.max_concurrency,
    )?;
    if max_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "ORDER_HISTORY_MAX_CONCURRENCY".to_string(),
            "must be at least 1".to_string(),
        ));
    }

    Ok(OrderHistorySettings {
        store_timeout: get_millis_or_default(
            "ORDER_HISTORY_STORE_TIMEOUT_MS",
            defaults.store_timeout,
        )?,
        provider_timeout: get_millis_or_default(
            "ORDER_HISTORY_PROVIDER_TIMEOUT_MS",
            defaults.provider_timeout,
        )?,
        max_concurrency,
        unbounded_up_to: get_parsed_or_default(
            "ORDER_HISTORY_UNBOUNDED_UP_TO",
            defaults.unbounded_up_to,
        )?,
        failure_policy: get_parsed_or_default::<FailurePolicy>(
            "ORDER_HISTORY_FAILURE_POLICY",
            defaults.failure_policy,
        )?,
        ..defaults
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a millisecond duration, falling back to `default`.
fn get_millis_or_default(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        parse_value::<u64>(key, &raw).map(Duration::from_millis)
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
