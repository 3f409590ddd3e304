//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the database named by `DELICIOUS_DATABASE_URL`, or `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DELICIOUS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DELICIOUS_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(delicious_web::db::create_pool(&database_url).await?)
}
