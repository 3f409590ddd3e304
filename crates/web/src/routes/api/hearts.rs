//! Heart toggle endpoint.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header::ACCEPT},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use delicious_core::StoreId;

use crate::middleware::RequireAuth;
use crate::routes::redirect_back;
use crate::services::stores::StoreService;
use crate::state::AppState;

use super::ApiError;

/// The user's hearts after a toggle.
#[derive(Debug, Serialize)]
pub struct HeartsResponse {
    pub hearts: Vec<StoreId>,
}

/// Heart or un-heart a store.
///
/// POST /api/stores/{id}/heart
///
/// Answers with JSON for script requests; a plain form post is sent back to
/// the page it came from.
///
/// # Errors
///
/// Returns `ApiError` if the store does not exist or the update fails.
#[instrument(skip(state, headers, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let hearts = StoreService::new(state.pool())
        .toggle_heart(user.id, StoreId::new(id))
        .await?;

    if wants_json(&headers) {
        Ok(Json(HeartsResponse { hearts }).into_response())
    } else {
        Ok(redirect_back(&headers, "/hearts").into_response())
    }
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert(ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert!(!wants_json(&headers));
        headers.insert(ACCEPT, "application/json".parse().unwrap());
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_hearts_response_shape() {
        let body = serde_json::to_value(HeartsResponse {
            hearts: vec![StoreId::new(3), StoreId::new(9)],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "hearts": [3, 9] }));
    }
}
