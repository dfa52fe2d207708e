//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PIXSTORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PIXSTORE_BASE_URL` - Public URL for the store
//! - `PIXSTORE_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `PIX_CLIENT_ID` - Client identifier issued by the PIX provider
//!
//! ## Optional
//! - `PIXSTORE_HOST` - Bind address (default: 127.0.0.1)
//! - `PIXSTORE_PORT` - Listen port (default: 3000)
//! - `PIX_API_BASE_URL` - PIX provider base URL (default: `https://mlanonovo.shop/apipix`)
//! - `PIX_GENERATE_ATTEMPTS` - Charge generation attempts (default: 5)
//! - `PIX_RETRY_BASE_MS` - Base retry delay, doubled per attempt (default: 500)
//! - `PIX_PAYMENT_WINDOW_MINUTES` - Time a customer has to pay (default: 15)
//! - `PIX_WATCHER_INTERVAL_SECS` - Background verification interval (default: 10)
//! - `PIX_HTTP_TIMEOUT_SECS` - Provider request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_PIX_API_BASE_URL: &str = "https://mlanonovo.shop/apipix";

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
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, also decides whether cookies are `Secure`
    pub base_url: String,
    pub session_secret: SecretString,
    pub pix: PixConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("session_secret", &"[REDACTED]")
            .field("pix", &self.pix)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// PIX provider settings.
///
/// The provider URL and client identifier stay server-side; browsers only
/// ever see the order's QR code.
#[derive(Clone)]
pub struct PixConfig {
    pub api_base_url: Url,
    pub client_id: SecretString,
    /// Total attempts for charge generation, including the first
    pub generate_attempts: u32,
    pub retry_base_delay: Duration,
    pub payment_window: Duration,
    pub watcher_interval: Duration,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for PixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("client_id", &"[REDACTED]")
            .field("generate_attempts", &self.generate_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("payment_window", &self.payment_window)
            .field("watcher_interval", &self.watcher_interval)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
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

        let database_url = get_database_url("PIXSTORE_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("PIXSTORE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("PIXSTORE_PORT", "3000")?;
        let base_url = get_required_env("PIXSTORE_BASE_URL")?;
        let session_secret = get_validated_secret("PIXSTORE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "PIXSTORE_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            pix: PixConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the store is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PixConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_base = get_env_or_default("PIX_API_BASE_URL", DEFAULT_PIX_API_BASE_URL);
        let api_base_url = parse_base_url(&raw_base)
            .map_err(|e| ConfigError::InvalidEnvVar("PIX_API_BASE_URL".to_string(), e))?;

        let generate_attempts = parse_env_or_default::<u32>("PIX_GENERATE_ATTEMPTS", "5")?;
        if generate_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PIX_GENERATE_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            client_id: SecretString::from(get_required_env("PIX_CLIENT_ID")?),
            generate_attempts,
            retry_base_delay: Duration::from_millis(parse_env_or_default::<u64>(
                "PIX_RETRY_BASE_MS",
                "500",
            )?),
            payment_window: Duration::from_secs(
                parse_env_or_default::<u64>("PIX_PAYMENT_WINDOW_MINUTES", "15")? * 60,
            ),
            watcher_interval: Duration::from_secs(parse_env_or_default::<u64>(
                "PIX_WATCHER_INTERVAL_SECS",
                "10",
            )?),
            http_timeout: Duration::from_secs(parse_env_or_default::<u64>(
                "PIX_HTTP_TIMEOUT_SECS",
                "15",
            )?),
        })
    }
}

/// Parse a provider base URL, making sure it ends in `/` so that
/// `Url::join` appends endpoint names instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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
