//! Review star rating.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a value is outside the 1-5 star range.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i64,
}

/// A review rating of one to five stars.
///
/// Stored as `SMALLINT` with a matching CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: u8 = 1;
    /// Highest allowed rating.
    pub const MAX: u8 = 5;

    /// Create a rating, rejecting values outside `MIN..=MAX`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if the value is not between 1 and 5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    /// Get the number of stars.
    #[must_use]
    pub const fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(self.0), buf)
    }
}
