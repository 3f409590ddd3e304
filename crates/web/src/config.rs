//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `DELICIOUS_BASE_URL` - Public URL of the site, used in password reset links
//! - `DELICIOUS_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DELICIOUS_HOST` - Bind address (default: 127.0.0.1)
//! - `DELICIOUS_PORT` - Listen port (default: 7777)
//! - `DELICIOUS_UPLOAD_DIR` - Where store photos are written (default: `crates/web/static/uploads`)
//! - `MAP_KEY` - Browser key for the maps script on the map and store pages
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   outgoing mail; without `SMTP_HOST` reset links are only logged
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Delicious application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Directory store photos are written to and served from
    pub upload_dir: PathBuf,
    /// Browser maps key, exposed to templates
    pub map_key: Option<String>,
    /// Outgoing mail (optional)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP configuration for password reset mail.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl AppConfig {
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

        let database_url = get_database_url("DELICIOUS_DATABASE_URL")?;
        let host = get_env_or_default("DELICIOUS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DELICIOUS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DELICIOUS_PORT", "7777")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DELICIOUS_PORT".to_string(), e.to_string()))?;
        let base_url = parse_base_url(&get_required_env("DELICIOUS_BASE_URL")?)?;
        let session_secret = get_validated_secret("DELICIOUS_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "DELICIOUS_SESSION_SECRET")?;
        let upload_dir = PathBuf::from(get_env_or_default(
            "DELICIOUS_UPLOAD_DIR",
            "crates/web/static/uploads",
        ));
        let map_key = get_optional_env("MAP_KEY");
        let email = EmailConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            upload_dir,
            map_key,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (controls the secure cookie flag).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL for a site path such as `/account/reset/abc`.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl EmailConfig {
    /// Mail is optional; it is configured only when `SMTP_HOST` is set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_env_or_default("SMTP_FROM", "Delicious <noreply@delicious.local>"),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("DELICIOUS_BASE_URL".to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "DELICIOUS_BASE_URL".to_string(),
            "must have a host".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
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

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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
    let len = s.len() as f64;
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/delicious"),
            host: "127.0.0.1".parse().unwrap(),
            port: 7777,
            base_url: "http://localhost:7777".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            upload_dir: PathBuf::from("static/uploads"),
            map_key: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-session-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        assert_eq!(
            parse_base_url("https://delicious.test/").unwrap(),
            "https://delicious.test"
        );
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = config();
        assert_eq!(config.socket_addr().port(), 7777);
        assert!(!config.is_https());
        assert_eq!(
            config.absolute_url("/account/reset/abc"),
            "http://localhost:7777/account/reset/abc"
        );
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let email = EmailConfig {
            smtp_host: "smtp.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2-but-longer"),
            from_address: "noreply@delicious.test".to_string(),
        };
        let debug_output = format!("{email:?}");
        assert!(debug_output.contains("smtp.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}
