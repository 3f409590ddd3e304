//! Heart (favorite store) repository.

use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{StoreId, UserId};

use super::RepositoryError;

/// Repository for a user's hearted stores.
pub struct HeartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeartRepository<'a> {
    /// Create a new heart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// IDs of the stores `user` has hearted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let ids: Vec<StoreId> = sqlx::query_scalar(
            "SELECT store_id FROM delicious.heart WHERE user_id = $1 ORDER BY store_id",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Add or remove `store` from the user's hearts.
    ///
    /// Returns `true` if the store is hearted afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user: UserId, store: StoreId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM delicious.heart WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user)
        .bind(store)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                r"
                INSERT INTO delicious.heart (user_id, store_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::NotFound;
                }
                RepositoryError::Database(e)
            })?;
        }

        tx.commit().await?;
        Ok(!removed)
    }
}
