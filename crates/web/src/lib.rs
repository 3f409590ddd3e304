//! Delicious web application library.
//!
//! The server is built here so the binary and the integration tests share
//! one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::AppError;
use crate::state::AppState;

/// Directory of bundled static assets, relative to the working directory.
pub const STATIC_DIR: &str = "crates/web/static";

/// Build the full application router.
///
/// The Sentry layers are added by the binary, outside this router.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());
    let upload_dir = state.config().upload_dir.clone();

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("page".to_owned())
}
