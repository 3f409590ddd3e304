//! Authentication error types.

use thiserror::Error;

use delicious_core::ValidationErrors;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Form input failed validation (including an email already in use).
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Password reset token unknown or expired.
    #[error("password reset token is invalid or has expired")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
