//! Store page handlers: listing, detail, add and edit.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::{StoreDraft, StoreId, ValidationErrors};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Flash, OptionalAuth, RequireAuth, push_flash};
use crate::models::{CurrentUser, Review, Store};
use crate::services::stores::{StoreError, StoreService};
use crate::services::uploads::{UploadError, remove_photo, save_photo};
use crate::state::AppState;

use super::views::{Page, StoreCard, TagOption, store_cards, tag_options};

// =============================================================================
// Templates
// =============================================================================

/// Paginated store listing.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub page: Page,
    pub cards: Vec<StoreCard>,
    pub current: i64,
    pub pages: i64,
    pub count: i64,
    pub prev: Option<i64>,
    pub next: Option<i64>,
}

/// Store detail with reviews.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub page: Page,
    pub store: Store,
    pub reviews: Vec<Review>,
    pub editable: bool,
    pub static_map: Option<String>,
}

/// Add/edit store form.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct StoreFormTemplate {
    pub page: Page,
    pub action: String,
    pub submit: &'static str,
    pub draft: StoreDraft,
    pub tags: Vec<TagOption>,
    pub photo_url: Option<String>,
}

impl StoreFormTemplate {
    fn new(page: Page, action: String, draft: StoreDraft, photo_url: Option<String>) -> Self {
        let tags = tag_options(&draft.tags);
        Self {
            submit: if photo_url.is_some() { "Save" } else { "Save Store" },
            page,
            action,
            draft,
            tags,
            photo_url,
        }
    }
}

// =============================================================================
// Multipart form
// =============================================================================

/// A photo file as uploaded.
struct PhotoUpload {
    content_type: String,
    bytes: Bytes,
}

/// Store form fields plus the optional photo.
struct StoreSubmission {
    draft: StoreDraft,
    photo: Option<PhotoUpload>,
}

async fn read_store_form(mut multipart: Multipart) -> Result<StoreSubmission> {
    let mut draft = StoreDraft::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            // An empty file input still sends an empty part
            if !bytes.is_empty() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => draft.name = value,
            "description" => draft.description = value,
            "tags" => draft.tags.push(value),
            "address" => draft.address = value,
            "lng" => draft.lng = value,
            "lat" => draft.lat = value,
            _ => {}
        }
    }

    Ok(StoreSubmission { draft, photo })
}

/// Write the photo if one was sent.
async fn store_photo(
    state: &AppState,
    photo: Option<&PhotoUpload>,
) -> std::result::Result<Option<String>, UploadError> {
    match photo {
        Some(p) => save_photo(&state.config().upload_dir, &p.content_type, &p.bytes)
            .await
            .map(Some),
        None => Ok(None),
    }
}

/// Delete a photo written for a submission that was not saved.
async fn discard_photo(state: &AppState, photo: Option<&str>) {
    if let Some(name) = photo
        && let Err(e) = remove_photo(&state.config().upload_dir, name).await
    {
        tracing::warn!(error = %e, file = %name, "Failed to remove unused photo");
    }
}

fn draft_from_store(store: &Store) -> StoreDraft {
    StoreDraft {
        name: store.name.clone(),
        description: store.description.clone().unwrap_or_default(),
        tags: store.tags.clone(),
        address: store.location.address.clone(),
        lng: store.location.point.lng().to_string(),
        lat: store.location.point.lat().to_string(),
    }
}

/// Re-render the store form with the submitted values and what was wrong.
async fn invalid_form(
    state: &AppState,
    session: &Session,
    user: CurrentUser,
    action: String,
    draft: StoreDraft,
    photo_url: Option<String>,
    errors: &ValidationErrors,
) -> Response {
    let title = if photo_url.is_some() {
        format!("Edit {}", draft.name)
    } else {
        "Add Store".to_owned()
    };
    let page = Page::new(state, session, Some(user), title)
        .await
        .with_errors(errors);
    let template = StoreFormTemplate::new(page, action, draft, photo_url);
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

/// Validate the form up front, then store the photo.
///
/// `Ok(Err(errors))` means the form should be shown again.
async fn prepare_submission(
    state: &AppState,
    submission: &StoreSubmission,
) -> Result<std::result::Result<Option<String>, ValidationErrors>> {
    if let Err(errors) = submission.draft.validate() {
        return Ok(Err(errors));
    }
    match store_photo(state, submission.photo.as_ref()).await {
        Ok(photo) => Ok(Ok(photo)),
        Err(e @ UploadError::NotAnImage(_)) => {
            Ok(Err(ValidationErrors::single("photo", e.to_string())))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Listing
// =============================================================================

/// First page of stores.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    render_page(&state, &session, user, 1).await
}

/// A numbered page of stores.
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(page): Path<i64>,
) -> Result<Response> {
    render_page(&state, &session, user, page).await
}

async fn render_page(
    state: &AppState,
    session: &Session,
    user: Option<CurrentUser>,
    requested: i64,
) -> Result<Response> {
    let service = StoreService::new(state.pool());

    let listing = match service.list_page(requested).await? {
        Ok(listing) => listing,
        Err(last) => {
            let flash = Flash::info(format!(
                "Hey! You asked for page {requested}. But that doesn't exist. So I put you on page {last}"
            ));
            if let Err(e) = push_flash(session, flash).await {
                tracing::warn!(error = %e, "Failed to store flash");
            }
            return Ok(Redirect::to(&format!("/stores/page/{last}")).into_response());
        }
    };

    let cards = store_cards(&service, user.as_ref(), &listing.stores).await?;
    let page = Page::new(state, session, user, "Stores").await;

    Ok(StoresTemplate {
        page,
        cards,
        current: listing.page,
        pages: listing.pages,
        count: listing.count,
        prev: (listing.page > 1).then_some(listing.page - 1),
        next: (listing.page < listing.pages).then_some(listing.page + 1),
    }
    .into_response())
}

// =============================================================================
// Detail
// =============================================================================

/// Store detail page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Response> {
    let (store, reviews) = StoreService::new(state.pool())
        .get_by_slug(&slug)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound(format!("store {slug}")),
            other => other.into(),
        })?;

    let editable = user.as_ref().is_some_and(|u| store.is_owned_by(u.id));
    let static_map = state
        .config()
        .map_key
        .as_deref()
        .map(|key| static_map_url(&store, key));
    let page = Page::new(&state, &session, user, store.name.clone()).await;

    Ok(StoreTemplate {
        page,
        store,
        reviews,
        editable,
        static_map,
    }
    .into_response())
}

fn static_map_url(store: &Store, key: &str) -> String {
    let (lat, lng) = (store.location.point.lat(), store.location.point.lng());
    format!(
        "https://maps.googleapis.com/maps/api/staticmap?center={lat},{lng}&zoom=14&size=800x150&key={key}&markers={lat},{lng}&scale=2"
    )
}

// =============================================================================
// Add / Edit
// =============================================================================

/// Empty add-store form.
pub async fn add_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    let page = Page::new(&state, &session, Some(user), "Add Store").await;
    StoreFormTemplate::new(page, "/add".to_owned(), StoreDraft::default(), None)
}

/// Create a store from the add form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let submission = read_store_form(multipart).await?;
    let action = "/add".to_owned();

    let photo = match prepare_submission(&state, &submission).await? {
        Ok(photo) => photo,
        Err(errors) => {
            return Ok(
                invalid_form(&state, &session, user, action, submission.draft, None, &errors).await,
            );
        }
    };

    let store = match StoreService::new(state.pool())
        .create(&submission.draft, photo.as_deref(), user.id)
        .await
    {
        Ok(store) => store,
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            return match e {
                StoreError::Validation(errors) => Ok(invalid_form(
                    &state,
                    &session,
                    user,
                    action,
                    submission.draft,
                    None,
                    &errors,
                )
                .await),
                other => Err(other.into()),
            };
        }
    };

    let flash = Flash::success(format!(
        "Successfully created {}. Care to leave a review?",
        store.name
    ));
    if let Err(e) = push_flash(&session, flash).await {
        tracing::warn!(error = %e, "Failed to store flash");
    }
    Ok(Redirect::to(&store.url()).into_response())
}

/// Edit form for a store the user owns.
pub async fn edit_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response> {
    let store = StoreService::new(state.pool())
        .editable(StoreId::new(id), user.id)
        .await
        .map_err(ownership_error)?;

    let page = Page::new(&state, &session, Some(user), format!("Edit {}", store.name)).await;
    Ok(StoreFormTemplate::new(
        page,
        format!("/add/{}", store.id),
        draft_from_store(&store),
        Some(store.photo_url()),
    )
    .into_response())
}

/// Save the edit form.
#[instrument(skip_all, fields(user_id = %user.id, store_id = id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response> {
    let id = StoreId::new(id);
    let service = StoreService::new(state.pool());
    let existing = service
        .editable(id, user.id)
        .await
        .map_err(ownership_error)?;
    let submission = read_store_form(multipart).await?;
    let action = format!("/add/{id}");
    let photo_url = Some(existing.photo_url());

    let photo = match prepare_submission(&state, &submission).await? {
        Ok(photo) => photo,
        Err(errors) => {
            return Ok(
                invalid_form(&state, &session, user, action, submission.draft, photo_url, &errors)
                    .await,
            );
        }
    };

    let store = match service
        .update(id, &submission.draft, photo.as_deref(), user.id)
        .await
    {
        Ok(store) => store,
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            return match e {
                StoreError::Validation(errors) => Ok(invalid_form(
                    &state,
                    &session,
                    user,
                    action,
                    submission.draft,
                    photo_url,
                    &errors,
                )
                .await),
                other => Err(ownership_error(other)),
            };
        }
    };

    let flash = Flash::success(format!("Successfully updated {}.", store.name));
    if let Err(e) = push_flash(&session, flash).await {
        tracing::warn!(error = %e, "Failed to store flash");
    }
    Ok(Redirect::to(&format!("/stores/{}/edit", store.id)).into_response())
}

fn ownership_error(e: StoreError) -> AppError {
    match e {
        StoreError::NotOwner => {
            AppError::Forbidden("You must own a store in order to edit it!".to_owned())
        }
        StoreError::NotFound => AppError::NotFound("store".to_owned()),
        other => other.into(),
    }
}
