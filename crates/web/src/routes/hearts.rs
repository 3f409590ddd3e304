//! The logged-in user's hearted stores.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::stores::StoreService;
use crate::state::AppState;

use super::views::{Page, StoreCard};

/// Grid of hearted stores.
#[derive(Template, WebTemplate)]
#[template(path = "hearts.html")]
pub struct HeartsTemplate {
    pub page: Page,
    pub cards: Vec<StoreCard>,
}

/// Show the user's hearted stores.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let service = StoreService::new(state.pool());
    let stores = service.hearted_stores(user.id).await?;
    let hearts: Vec<_> = stores.iter().map(|s| s.id).collect();
    let cards = stores
        .iter()
        .map(|s| StoreCard::new(s, Some(&user), &hearts))
        .collect();
    let page = Page::new(&state, &session, Some(user), "Hearted Stores").await;

    Ok(HeartsTemplate { page, cards }.into_response())
}
