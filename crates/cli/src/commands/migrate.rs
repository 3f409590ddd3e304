//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! dl-cli migrate
//! ```
//!
//! Applies the schema in `crates/web/migrations/` and creates the session
//! table used by `tower-sessions`.
//!
//! # Environment Variables
//!
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the schema and session store migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
