//! User repository for database operations.
//!
//! Rows are decoded into [`UserRow`] and converted to the domain [`User`],
//! re-validating the stored email on the way out.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            email,
            name: r.name,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM delicious.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM delicious.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO delicious.user (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        User::try_from(row)
    }

    /// Get the user and password hash for a login attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: String,
        }

        let row: Option<Row> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM delicious.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// Update a user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email belongs to another user.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.user
            SET name = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(User::try_from)
    }

    /// Store a password reset token and its expiry on the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self, token))]
    pub async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE delicious.user
            SET reset_password_token = $2, reset_password_expires = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Find the user holding `token`, provided it has not expired.
    ///
    /// An expired token is cleared from its user on the way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        self.clear_expired_reset_token(token).await?;

        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS} FROM delicious.user
            WHERE reset_password_token = $1 AND reset_password_expires > NOW()
            "
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Null out `token` and its expiry if it has expired.
    async fn clear_expired_reset_token(&self, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE delicious.user
            SET reset_password_token = NULL,
                reset_password_expires = NULL,
                updated_at = NOW()
            WHERE reset_password_token = $1 AND reset_password_expires <= NOW()
            ",
        )
        .bind(token)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!("Cleared expired reset token");
        }
        Ok(())
    }

    /// Consume an unexpired reset token: set the new password hash and clear
    /// the token fields in one statement.
    ///
    /// Returns `None` when no user holds a live `token`, so a token can only
    /// ever be redeemed once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.user
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL,
                updated_at = NOW()
            WHERE reset_password_token = $1 AND reset_password_expires > NOW()
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(token)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
