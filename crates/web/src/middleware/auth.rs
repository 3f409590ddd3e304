//! Authentication extractors.
//!
//! The logged-in user lives in the session under
//! [`keys::CURRENT_USER`](crate::models::session::keys::CURRENT_USER).

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::models::session::keys;

use super::flash::{Flash, push_flash};

/// Extractor that requires a logged-in user.
///
/// Page requests without a user are redirected to the login page with a
/// flash; API requests get a bare 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped path; the original keeps the `/api` prefix
        let is_api = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0)
            .path()
            .starts_with("/api/");

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        if let Some(user) = current_user(session).await {
            return Ok(Self(user));
        }

        if is_api {
            return Err(AuthRejection::Unauthorized);
        }
        if let Err(e) = push_flash(session, Flash::error("Oops you must be logged in to do that!")).await {
            tracing::warn!(error = %e, "Failed to store login flash");
        }
        Err(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Log `user` in, cycling the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Log the current user out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}
