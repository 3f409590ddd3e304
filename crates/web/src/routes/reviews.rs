//! Review submission.

use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::{ReviewDraft, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::{Flash, RequireAuth, push_flashes};
use crate::services::stores::{StoreError, StoreService};
use crate::state::AppState;

use super::redirect_back;

/// Save a review on a store, then return to the page it was posted from.
#[instrument(skip(state, session, headers, user, draft), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(draft): Form<ReviewDraft>,
) -> Result<Response> {
    let flashes = match StoreService::new(state.pool())
        .add_review(StoreId::new(id), user.id, &draft)
        .await
    {
        Ok(review_id) => {
            tracing::info!(review_id = %review_id, store_id = id, "Review saved");
            vec![Flash::success("Review Saved!")]
        }
        Err(StoreError::Validation(errors)) => Flash::errors(errors.messages()),
        Err(StoreError::NotFound) => return Err(AppError::NotFound("store".to_owned())),
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = push_flashes(&session, flashes).await {
        tracing::warn!(error = %e, "Failed to store flash");
    }
    Ok(redirect_back(&headers, "/stores").into_response())
}
