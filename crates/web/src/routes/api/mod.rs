//! JSON API used by the search box, the map and the heart buttons.

pub mod hearts;
pub mod stores;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::stores::StoreError;

/// Error body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            error: msg.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::new(StatusCode::NOT_FOUND, "Store not found"),
            StoreError::Validation(errors) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, errors.to_string())
            }
            other => {
                let event_id = sentry::capture_error(&other);
                tracing::error!(error = %other, sentry_event_id = %event_id, "API error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
