//! Review repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{NewReview, Rating, ReviewId, StoreId, UserId};

use super::RepositoryError;
use crate::models::Review;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    store_id: StoreId,
    author_id: UserId,
    author_name: Option<String>,
    text: String,
    rating: Rating,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            author_id: r.author_id,
            author_name: r.author_name,
            text: r.text,
            rating: r.rating,
            created_at: r.created_at,
        }
    }
}

// Authors are LEFT JOINed so a review whose author row is gone still loads.
const REVIEW_SELECT: &str = r"
    SELECT r.id, r.store_id, r.author_id, u.name AS author_name,
           r.text, r.rating, r.created_at
    FROM delicious.review r
    LEFT JOIN delicious.user u ON u.id = r.author_id
";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save a review by `author` on `store`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, review), fields(rating = %review.rating))]
    pub async fn create(
        &self,
        store: StoreId,
        author: UserId,
        review: &NewReview,
    ) -> Result<ReviewId, RepositoryError> {
        let id: ReviewId = sqlx::query_scalar(
            r"
            INSERT INTO delicious.review (store_id, author_id, text, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(store)
        .bind(author)
        .bind(&review.text)
        .bind(review.rating)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(id)
    }

    /// Reviews on one store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE r.store_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Reviews on any of `stores`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_stores(&self, stores: &[StoreId]) -> Result<Vec<Review>, RepositoryError> {
        if stores.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = stores.iter().map(StoreId::as_i32).collect();
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE r.store_id = ANY($1) ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }
}
