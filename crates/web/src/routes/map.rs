//! Map page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

use super::views::Page;

/// Map container and near-me search form. The page's map script reads
/// `/api/stores/near`.
#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub page: Page,
}

/// Show the map page.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    MapTemplate {
        page: Page::new(&state, &session, user, "Map").await,
    }
}
