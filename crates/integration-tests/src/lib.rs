//! Integration tests for Delicious.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests, no database needed
//! cargo test -p delicious-integration-tests
//!
//! # Full site tests against a running server and a migrated database
//! dl-cli migrate
//! cargo run -p delicious-web &
//! cargo test -p delicious-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `router` - The assembled router driven in-process with `tower::ServiceExt`
//! - `database` - Services against a migrated database (reset tokens, slug races)
//! - `site` - Signup, store submission and editing, tags and search over HTTP

use std::path::PathBuf;

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use delicious_web::config::AppConfig;
use delicious_web::state::AppState;

/// A configuration that never reaches outside the process.
///
/// # Panics
///
/// Panics if the hard-coded bind address fails to parse.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost:1/delicious_test"),
        host: "127.0.0.1".parse().expect("valid address"),
        port: 7777,
        base_url: "http://localhost:7777".to_owned(),
        session_secret: SecretString::from("q8Vz3kLmN0pR7sTuWx2yB5cD9fGhJ4aE"),
        upload_dir: PathBuf::from("target/test-uploads"),
        map_key: None,
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Application state over a pool that only connects when first used.
///
/// Requests that never query the database run without one.
///
/// # Panics
///
/// Panics if the database URL in [`test_config`] is malformed.
#[must_use]
pub fn test_state() -> AppState {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost:1/delicious_test")
        .expect("valid database url");
    AppState::new(config, pool)
}

/// Base URL of a running server for the `site` tests.
#[must_use]
pub fn site_base_url() -> String {
    std::env::var("DELICIOUS_BASE_URL").unwrap_or_else(|_| "http://localhost:7777".to_owned())
}

/// Connect to the database named by `DELICIOUS_DATABASE_URL`, or `DATABASE_URL`.
///
/// # Panics
///
/// Panics if neither variable is set or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DELICIOUS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DELICIOUS_DATABASE_URL or DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("Failed to connect to test database")
}
