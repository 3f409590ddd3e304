//! Database operations for the Delicious `PostgreSQL` schema.
//!
//! ## Tables (schema `delicious`)
//!
//! - `user` - Accounts, password hashes and pending reset tokens
//! - `store` - Stores with location, tags and a generated search vector
//! - `review` - Star ratings and text left on stores
//! - `heart` - A user's favorite stores
//!
//! Sessions live in the `tower_sessions` schema managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p delicious-cli -- migrate
//! ```

pub mod hearts;
pub mod reviews;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use hearts::HeartRepository;
pub use reviews::ReviewRepository;
pub use stores::StoreRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
