//! Tag browsing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::stores::StoreService;
use crate::state::AppState;

use super::views::{Page, StoreCard, store_cards};

/// A tag in the tag bar.
pub struct TagLink {
    pub name: String,
    pub count: u64,
    pub active: bool,
}

/// Tag counts and the stores for the selected tag.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub page: Page,
    pub tags: Vec<TagLink>,
    pub selected: Option<String>,
    pub cards: Vec<StoreCard>,
}

/// Every tag, with all tagged stores listed.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    render(&state, &session, user, None).await
}

/// Every tag, with the stores for one tag listed.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(tag): Path<String>,
) -> Result<Response> {
    render(&state, &session, user, Some(tag)).await
}

async fn render(
    state: &AppState,
    session: &Session,
    user: Option<CurrentUser>,
    selected: Option<String>,
) -> Result<Response> {
    let service = StoreService::new(state.pool());

    let (counts, stores) = tokio::try_join!(
        service.list_tags(),
        service.stores_for_tag(selected.as_deref())
    )?;

    let tags = counts
        .into_iter()
        .map(|t| TagLink {
            active: selected.as_deref() == Some(t.tag.as_str()),
            name: t.tag,
            count: t.count,
        })
        .collect();
    let cards = store_cards(&service, user.as_ref(), &stores).await?;
    let title = selected.clone().unwrap_or_else(|| "Tags".to_owned());
    let page = Page::new(state, session, user, title).await;

    Ok(TagsTemplate {
        page,
        tags,
        selected,
        cards,
    }
    .into_response())
}
