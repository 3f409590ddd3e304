//! Authentication route handlers.
//!
//! Login, logout, registration and the password reset flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    Flash, OptionalAuth, clear_current_user, push_flash, push_flashes, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService, RegistrationForm};
use crate::state::AppState;

use super::views::Page;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page, with the forgot-password form.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: Page,
}

/// Registration page.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub name: String,
    pub email: String,
}

/// New-password page reached from a reset link.
#[derive(Template, WebTemplate)]
#[template(path = "reset.html")]
pub struct ResetTemplate {
    pub page: Page,
    pub token: String,
}

const INVALID_RESET: &str = "Password reset is invalid or has expired";

async fn flash(session: &Session, flash: Flash) {
    if let Err(e) = push_flash(session, flash).await {
        tracing::warn!(error = %e, "Failed to store flash");
    }
}

/// Put `user` in the session and tag Sentry with them.
async fn log_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    LoginTemplate {
        page: Page::new(&state, &session, user, "Login").await,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            log_in(&session, &user).await?;
            flash(&session, Flash::success("You are now logged in!")).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            flash(&session, Flash::error("Failed Login!")).await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Log out and return to the home page.
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    clear_sentry_user();
    flash(&session, Flash::success("You are now logged out! 👋")).await;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    RegisterTemplate {
        page: Page::new(&state, &session, user, "Register").await,
        name: String::new(),
        email: String::new(),
    }
}

/// Register and log in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response> {
    match AuthService::new(state.pool()).register(&form).await {
        Ok(user) => {
            log_in(&session, &user).await?;
            flash(&session, Flash::success("You are now logged in!")).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let page = Page::new(&state, &session, None, "Register")
                .await
                .with_errors(&errors);
            let template = RegisterTemplate {
                page,
                name: form.name,
                email: form.email,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Start a password reset.
///
/// The response is the same whether or not the email has an account.
#[instrument(skip(state, session, form))]
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response> {
    if let Some((user, token)) = AuthService::new(state.pool())
        .request_password_reset(&form.email)
        .await?
    {
        let reset_url = state
            .config()
            .absolute_url(&format!("/account/reset/{token}"));

        match state.email() {
            Some(email) => {
                if let Err(e) = email
                    .send_password_reset(user.email.as_str(), &user.name, &reset_url)
                    .await
                {
                    tracing::error!(error = %e, user_id = %user.id, "Failed to send reset email");
                }
            }
            None => {
                tracing::info!(user_id = %user.id, %reset_url, "Email disabled, reset link not sent");
            }
        }
    }

    flash(
        &session,
        Flash::info("You have been emailed a password reset link."),
    )
    .await;
    Ok(Redirect::to("/login").into_response())
}

/// Display the new-password form for a valid reset token.
pub async fn reset_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(token): Path<String>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .user_for_reset_token(&token)
        .await
    {
        Ok(_) => {
            let page = Page::new(&state, &session, user, "Reset your Password").await;
            Ok(ResetTemplate { page, token }.into_response())
        }
        Err(AuthError::InvalidResetToken) => {
            flash(&session, Flash::error(INVALID_RESET)).await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply a password reset and log the user in.
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            log_in(&session, &user).await?;
            flash(
                &session,
                Flash::success("💃 Nice! Your password has been reset! You are now logged in!"),
            )
            .await;
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            if let Err(e) = push_flashes(&session, Flash::errors(errors.messages())).await {
                tracing::warn!(error = %e, "Failed to store flash");
            }
            Ok(Redirect::to(&format!("/account/reset/{token}")).into_response())
        }
        Err(AuthError::InvalidResetToken) => {
            flash(&session, Flash::error(INVALID_RESET)).await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}
