//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use delicious_core::ValidationErrors;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::stores::StoreError;
use crate::services::uploads::UploadError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Photo upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Input failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is our fault rather than the client's.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Store(StoreError::Repository(_))
                | Self::Upload(UploadError::Io(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::InvalidResetToken => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Store(err) => match err {
                StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::NotFound => StatusCode::NOT_FOUND,
                StoreError::NotOwner => StatusCode::FORBIDDEN,
                StoreError::SlugConflict => StatusCode::CONFLICT,
                StoreError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(err) => match err {
                UploadError::NotAnImage(_) => StatusCode::BAD_REQUEST,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server errors never leak their details.
    fn public_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Auth(AuthError::Validation(errors))
            | Self::Store(StoreError::Validation(errors))
            | Self::Validation(errors) => errors.to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Store(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store".to_string());
        assert_eq!(err.to_string(), "Not found: store");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_status_codes() {
        assert_eq!(status(StoreError::NotOwner.into()), StatusCode::FORBIDDEN);
        assert_eq!(status(StoreError::SlugConflict.into()), StatusCode::CONFLICT);
        assert_eq!(status(StoreError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(StoreError::Validation(ValidationErrors::single("name", "x")).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_message_is_public() {
        let err = AppError::Validation(ValidationErrors::single(
            "name",
            "Please enter a store name!",
        ));
        assert_eq!(err.public_message(), "name: Please enter a store name!");
    }

    #[test]
    fn test_server_error_message_is_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
