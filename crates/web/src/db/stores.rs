//! Store repository for database operations.
//!
//! Slug choice is not made here: callers pass the slug already picked by
//! [`delicious_core::assign_slug`]. A unique violation on the slug index comes
//! back as `RepositoryError::Conflict` so the caller can pick again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{
    BoundingBox, GeoPoint, Location, NewStore, Slug, StoreId, StoreWithReviews, UserId,
};

use super::{RepositoryError, ReviewRepository, conflict_on_unique};
use crate::models::{Review, Store};

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    slug: Slug,
    description: Option<String>,
    tags: Vec<String>,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    author_id: UserId,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(r: StoreRow) -> Result<Self, Self::Error> {
        let point = GeoPoint::new(r.lng, r.lat).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location for store {}: {e}", r.id))
        })?;

        Ok(Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            tags: r.tags,
            location: Location {
                point,
                address: r.address,
            },
            photo: r.photo,
            author_id: r.author_id,
            created_at: r.created_at,
        })
    }
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

const STORE_COLUMNS: &str =
    "id, name, slug, description, tags, lng, lat, address, photo, author_id, created_at";

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM delicious.store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Get a store by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM delicious.store WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Get the stores with the given IDs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(StoreId::as_i32).collect();
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM delicious.store WHERE id = ANY($1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS} FROM delicious.store
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delicious.store")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Existing slugs that could collide with `base`.
    ///
    /// `pattern` is the case-insensitive collision regex for the base slug.
    /// `exclude` leaves out the store being renamed so its own old slug does
    /// not count against it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slugs_matching(
        &self,
        pattern: &str,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        let slugs: Vec<String> = sqlx::query_scalar(
            r"
            SELECT slug FROM delicious.store
            WHERE slug ~* $1 AND ($2::INTEGER IS NULL OR id <> $2)
            ",
        )
        .bind(pattern)
        .bind(exclude)
        .fetch_all(self.pool)
        .await?;

        Ok(slugs)
    }

    /// Insert a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, store), fields(name = %store.name, slug = %slug))]
    pub async fn insert(
        &self,
        store: &NewStore,
        slug: &Slug,
        photo: Option<&str>,
        author: UserId,
    ) -> Result<Store, RepositoryError> {
        let row: StoreRow = sqlx::query_as(&format!(
            r"
            INSERT INTO delicious.store
                (name, slug, description, tags, lng, lat, address, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(&store.name)
        .bind(slug)
        .bind(store.description.as_deref())
        .bind(&store.tags)
        .bind(store.location.point.lng())
        .bind(store.location.point.lat())
        .bind(&store.location.address)
        .bind(photo)
        .bind(author)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?;

        Store::try_from(row)
    }

    /// Update an existing store.
    ///
    /// `slug` and `photo` are only written when `Some`; otherwise the stored
    /// values are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is already taken.
    #[instrument(skip(self, store), fields(name = %store.name))]
    pub async fn update(
        &self,
        id: StoreId,
        store: &NewStore,
        slug: Option<&Slug>,
        photo: Option<&str>,
    ) -> Result<Store, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.store
            SET name = $2,
                slug = COALESCE($3, slug),
                description = $4,
                tags = $5,
                lng = $6,
                lat = $7,
                address = $8,
                photo = COALESCE($9, photo)
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&store.name)
        .bind(slug)
        .bind(store.description.as_deref())
        .bind(&store.tags)
        .bind(store.location.point.lng())
        .bind(store.location.point.lat())
        .bind(&store.location.address)
        .bind(photo)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "slug"))?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Store::try_from)
    }

    /// The tag list of every store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_lists(&self) -> Result<Vec<Vec<String>>, RepositoryError> {
        let tags: Vec<Vec<String>> = sqlx::query_scalar("SELECT tags FROM delicious.store")
            .fetch_all(self.pool)
            .await?;
        Ok(tags)
    }

    /// Stores carrying `tag`, or every store with at least one tag when `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS} FROM delicious.store
            WHERE CASE WHEN $1::TEXT IS NULL THEN cardinality(tags) > 0 ELSE $1 = ANY(tags) END
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(tag)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Every store that has at least one review, joined with its reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_with_reviews(
        &self,
    ) -> Result<Vec<StoreWithReviews<Review>>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS} FROM delicious.store
            WHERE EXISTS (SELECT 1 FROM delicious.review r WHERE r.store_id = store.id)
            "
        ))
        .fetch_all(self.pool)
        .await?;
        let stores = into_stores(rows)?;

        let ids: Vec<StoreId> = stores.iter().map(|s| s.id).collect();
        let mut by_store: HashMap<StoreId, Vec<Review>> = HashMap::new();
        for review in ReviewRepository::new(self.pool).list_for_stores(&ids).await? {
            by_store.entry(review.store_id).or_default().push(review);
        }

        Ok(stores
            .into_iter()
            .map(|s| StoreWithReviews {
                reviews: by_store.remove(&s.id).unwrap_or_default(),
                id: s.id,
                name: s.name,
                slug: s.slug,
                photo: s.photo,
            })
            .collect())
    }

    /// Full-text search over name and description, best matches first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS} FROM delicious.store
            WHERE search @@ websearch_to_tsquery('english', $1)
            ORDER BY ts_rank(search, websearch_to_tsquery('english', $1)) DESC, id
            LIMIT $2
            "
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores whose point lies inside `bbox`. Callers rank by true distance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn within_box(&self, bbox: &BoundingBox) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS} FROM delicious.store
            WHERE lng BETWEEN $1 AND $2 AND lat BETWEEN $3 AND $4
            "
        ))
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }
}
