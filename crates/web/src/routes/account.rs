//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Flash, RequireAuth, push_flash, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AccountForm, AuthError, AuthService};
use crate::state::AppState;

use super::views::Page;

/// Account edit page.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub page: Page,
    pub name: String,
    pub email: String,
}

/// Display the account form.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    let name = user.name.clone();
    let email = user.email.to_string();
    AccountTemplate {
        page: Page::new(&state, &session, Some(user), "Edit Your Account").await,
        name,
        email,
    }
}

/// Save name and email changes.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .update_account(user.id, &form)
        .await
    {
        Ok(updated) => {
            set_current_user(&session, &CurrentUser::from(&updated))
                .await
                .map_err(|e| AppError::Internal(format!("session: {e}")))?;
            if let Err(e) = push_flash(&session, Flash::success("Updated the profile!")).await {
                tracing::warn!(error = %e, "Failed to store flash");
            }
            Ok(Redirect::to("/account").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let page = Page::new(&state, &session, Some(user), "Edit Your Account")
                .await
                .with_errors(&errors);
            let template = AccountTemplate {
                page,
                name: form.name,
                email: form.email,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
