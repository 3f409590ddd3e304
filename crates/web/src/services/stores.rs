//! Store service: writes with slug assignment, and the read views.
//!
//! The slug is picked here, right before persistence, and only when the name
//! is new or has changed. Concurrent writers can still race for the same
//! slug; the unique index rejects the loser, which retries with a fresh view
//! of the existing slugs.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use delicious_core::slug::{base_slug, collision_pattern};
use delicious_core::{
    GeoPoint, NEAR_LIMIT, NEAR_RADIUS_METERS, ReviewDraft, ReviewId, Slug, StoreDraft, StoreId,
    TagCount, TopStore, UserId, ValidationErrors, assign_slug, count_tags, nearest,
    rank_top_stores,
};

use crate::db::{HeartRepository, RepositoryError, ReviewRepository, StoreRepository};
use crate::models::{Review, Store};

/// Stores shown per listing page.
pub const STORES_PER_PAGE: i64 = 6;

/// Maximum results from the search API.
pub const SEARCH_LIMIT: i64 = 5;

/// Attempts at persisting a store before giving up on a contested slug.
const SLUG_ATTEMPTS: usize = 3;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The store does not exist.
    #[error("store not found")]
    NotFound,

    /// The user is not the store's author.
    #[error("you must own a store in order to edit it")]
    NotOwner,

    /// Every slug candidate was taken by a concurrent write.
    #[error("could not assign a unique slug, please try again")]
    SlugConflict,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One page of the store listing.
#[derive(Debug)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub page: i64,
    pub pages: i64,
    pub count: i64,
}

/// Where a requested page falls relative to the stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Fetch with this offset.
    Fetch { offset: i64, pages: i64 },
    /// The page is past the end; the last page is this one.
    PastEnd { last: i64 },
}

/// Work out the offset for `page` (1-based) given `count` stores.
#[must_use]
pub const fn paginate(page: i64, count: i64, per_page: i64) -> PageRequest {
    let page = if page < 1 { 1 } else { page };
    let pages = if count <= 0 {
        1
    } else {
        (count + per_page - 1) / per_page
    };
    if page > pages {
        PageRequest::PastEnd { last: pages }
    } else {
        PageRequest::Fetch {
            offset: (page - 1) * per_page,
            pages,
        }
    }
}

/// Store operations used by the routes.
pub struct StoreService<'a> {
    stores: StoreRepository<'a>,
    reviews: ReviewRepository<'a>,
    hearts: HeartRepository<'a>,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            hearts: HeartRepository::new(pool),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validate and create a store, assigning it a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for bad input and
    /// `StoreError::SlugConflict` if every slug attempt lost a race.
    #[instrument(skip(self, draft, photo), fields(name = %draft.name))]
    pub async fn create(
        &self,
        draft: &StoreDraft,
        photo: Option<&str>,
        author: UserId,
    ) -> Result<Store, StoreError> {
        let store = draft.validate()?;

        for attempt in 1..=SLUG_ATTEMPTS {
            let slug = self.next_slug(&store.name, None).await?;
            match self.stores.insert(&store, &slug, photo, author).await {
                Ok(created) => {
                    tracing::info!(store_id = %created.id, slug = %created.slug, "Store created");
                    return Ok(created);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::warn!(attempt, slug = %slug, "Slug taken concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::SlugConflict)
    }

    /// Validate and update a store owned by `editor`.
    ///
    /// The slug is recomputed only when the name changed. `photo` replaces the
    /// stored photo when present.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound`, `StoreError::NotOwner`,
    /// `StoreError::Validation` or `StoreError::SlugConflict`.
    #[instrument(skip(self, draft, photo))]
    pub async fn update(
        &self,
        id: StoreId,
        draft: &StoreDraft,
        photo: Option<&str>,
        editor: UserId,
    ) -> Result<Store, StoreError> {
        let existing = self.editable(id, editor).await?;
        let store = draft.validate()?;

        if store.name == existing.name {
            return Ok(self.stores.update(id, &store, None, photo).await?);
        }

        for attempt in 1..=SLUG_ATTEMPTS {
            let slug = self.next_slug(&store.name, Some(id)).await?;
            match self.stores.update(id, &store, Some(&slug), photo).await {
                Ok(updated) => {
                    tracing::info!(store_id = %id, slug = %updated.slug, "Store renamed");
                    return Ok(updated);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::warn!(attempt, slug = %slug, "Slug taken concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::SlugConflict)
    }

    /// Fetch a store for editing, checking ownership.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::NotOwner`.
    pub async fn editable(&self, id: StoreId, editor: UserId) -> Result<Store, StoreError> {
        let store = self
            .stores
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        if !store.is_owned_by(editor) {
            return Err(StoreError::NotOwner);
        }
        Ok(store)
    }

    /// Pick a slug for `name` against the slugs currently stored.
    async fn next_slug(&self, name: &str, exclude: Option<StoreId>) -> Result<Slug, StoreError> {
        let Some(base) = base_slug(name) else {
            return Err(ValidationErrors::single("name", "Please enter a store name!").into());
        };
        let existing = self
            .stores
            .slugs_matching(&collision_pattern(&base), exclude)
            .await?;

        assign_slug(name, existing.iter().map(String::as_str))
            .ok_or_else(|| ValidationErrors::single("name", "Please enter a store name!").into())
    }

    /// Validate and save a review by `author` on `store`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for bad input or
    /// `StoreError::NotFound` if the store does not exist.
    #[instrument(skip(self, draft))]
    pub async fn add_review(
        &self,
        store: StoreId,
        author: UserId,
        draft: &ReviewDraft,
    ) -> Result<ReviewId, StoreError> {
        let review = draft.validate()?;
        self.reviews
            .create(store, author, &review)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => StoreError::NotFound,
                other => StoreError::Repository(other),
            })
    }

    /// Heart or un-heart a store. Returns the user's hearts afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store does not exist.
    pub async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Vec<StoreId>, StoreError> {
        self.hearts
            .toggle(user, store)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => StoreError::NotFound,
                other => StoreError::Repository(other),
            })?;
        Ok(self.hearts.list(user).await?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// One page of stores, newest first.
    ///
    /// Returns `Err(last)` with the last page number when `page` is past the end.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn list_page(&self, page: i64) -> Result<Result<StorePage, i64>, StoreError> {
        let count = self.stores.count().await?;
        match paginate(page, count, STORES_PER_PAGE) {
            PageRequest::PastEnd { last } => Ok(Err(last)),
            PageRequest::Fetch { offset, pages } => {
                let stores = self.stores.list_page(STORES_PER_PAGE, offset).await?;
                Ok(Ok(StorePage {
                    stores,
                    page: page.max(1),
                    pages,
                    count,
                }))
            }
        }
    }

    /// A store and its reviews, newest review first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<(Store, Vec<Review>), StoreError> {
        let store = self
            .stores
            .get_by_slug(slug)
            .await?
            .ok_or(StoreError::NotFound)?;
        let reviews = self.reviews.list_for_store(store.id).await?;
        Ok((store, reviews))
    }

    /// Every distinct tag with the number of stores carrying it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<TagCount>, StoreError> {
        let tag_lists = self.stores.tag_lists().await?;
        Ok(count_tags(tag_lists))
    }

    /// Stores carrying `tag`, or all tagged stores when `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn stores_for_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, StoreError> {
        Ok(self.stores.list_by_tag(tag).await?)
    }

    /// The best-rated stores with at least two reviews.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn top_stores(&self) -> Result<Vec<TopStore<Review>>, StoreError> {
        let stores = self.stores.list_with_reviews().await?;
        Ok(rank_top_stores(stores))
    }

    /// Text search over store names and descriptions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Store>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.search(query, SEARCH_LIMIT).await?)
    }

    /// Stores within the near-me radius of `origin`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn near(&self, origin: GeoPoint) -> Result<Vec<(f64, Store)>, StoreError> {
        let candidates = self
            .stores
            .within_box(&origin.bounding_box(NEAR_RADIUS_METERS))
            .await?;

        Ok(nearest(
            &origin,
            candidates.into_iter().map(|s| (s.location.point, s)),
            NEAR_RADIUS_METERS,
            NEAR_LIMIT,
        ))
    }

    /// IDs of the stores `user` has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn heart_ids(&self, user: UserId) -> Result<Vec<StoreId>, StoreError> {
        Ok(self.hearts.list(user).await?)
    }

    /// The stores `user` has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn hearted_stores(&self, user: UserId) -> Result<Vec<Store>, StoreError> {
        let ids = self.hearts.list(user).await?;
        Ok(self.stores.get_many(&ids).await?)
    }
}
