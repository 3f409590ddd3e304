//! Top-rated stores page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::stores::StoreService;
use crate::state::AppState;

use super::views::{Page, TopRow};

/// Ranked table of the best-reviewed stores.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub page: Page,
    pub rows: Vec<TopRow>,
}

/// Show the top stores.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let top = StoreService::new(state.pool()).top_stores().await?;
    let rows = top
        .iter()
        .enumerate()
        .map(|(i, store)| TopRow::new(i + 1, store))
        .collect();
    let page = Page::new(&state, &session, user, "Top Stores").await;

    Ok(TopTemplate { page, rows }.into_response())
}
