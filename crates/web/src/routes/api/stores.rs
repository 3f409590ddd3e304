//! Store search and near-me endpoints.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use delicious_core::{GeoPoint, Slug};

use crate::models::Store;
use crate::services::stores::StoreService;
use crate::state::AppState;

use super::ApiError;

/// Query string for `/api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A search hit.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub slug: Slug,
}

/// Full-text search over store names and descriptions.
///
/// GET /api/search?q=
///
/// # Errors
///
/// Returns `ApiError` if the search query fails.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let stores = StoreService::new(state.pool()).search(&query.q).await?;

    Ok(Json(
        stores
            .into_iter()
            .map(|s| SearchResult {
                name: s.name,
                slug: s.slug,
            })
            .collect(),
    ))
}

/// Query string for `/api/stores/near`.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lat: f64,
    pub lng: f64,
}

/// Location as `GeoJSON`-style `[lng, lat]` coordinates plus the address.
#[derive(Debug, Serialize)]
pub struct NearLocation {
    pub address: String,
    pub coordinates: [f64; 2],
}

/// A store near the requested point.
#[derive(Debug, Serialize)]
pub struct NearStore {
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub location: NearLocation,
    pub photo: Option<String>,
    /// Distance from the requested point, in meters.
    pub distance: f64,
}

impl NearStore {
    fn new(distance: f64, store: Store) -> Self {
        Self {
            location: NearLocation {
                coordinates: [store.location.point.lng(), store.location.point.lat()],
                address: store.location.address,
            },
            slug: store.slug,
            name: store.name,
            description: store.description,
            photo: store.photo,
            distance,
        }
    }
}

/// Stores within 10 km of a point, nearest first.
///
/// GET /api/stores/near?lat=&lng=
///
/// # Errors
///
/// Returns `ApiError` for coordinates out of range or if the query fails.
#[instrument(skip(state))]
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearStore>>, ApiError> {
    let origin = GeoPoint::new(query.lng, query.lat)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let stores = StoreService::new(state.pool()).near(origin).await?;

    Ok(Json(
        stores
            .into_iter()
            .map(|(distance, store)| NearStore::new(distance, store))
            .collect(),
    ))
}
