//! URL slugs for stores.
//!
//! A store's slug is derived from its name and must be unique across all
//! stores. [`assign_slug`] is called by the store write path whenever the
//! name is set or changed; it never runs on saves that leave the name alone.
//!
//! Uniqueness is decided against a snapshot of existing slugs, so two
//! concurrent creations of the same name can still pick the same value. The
//! database's unique index catches that case and the caller retries with a
//! fresh snapshot.

use core::fmt;
use std::collections::HashSet;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Base used when a non-empty name has no sluggable characters (e.g. "!!!").
const FALLBACK_BASE: &str = "store";

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains characters other than `a-z`, `0-9` and `-`.
    #[error("slug may only contain lowercase letters, digits and hyphens")]
    InvalidCharacters,
}

/// A URL-safe store identifier: lowercase ASCII letters, digits and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Parse a slug, rejecting anything [`slugify`] could not have produced.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` if the input is empty or has disallowed characters.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Turn a display name into a base slug.
///
/// Lowercases, transliterates diacritics, drops punctuation and joins words
/// with single hyphens: `"Café Olé!"` becomes `"cafe-ole"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    slug::slugify(name.trim())
}

/// Regex matching `base` itself or `base` followed by `-<digits>`.
///
/// The same pattern is handed to Postgres (`slug ~* $1`) to fetch the
/// candidate set, so it sticks to syntax both engines understand.
#[must_use]
pub fn collision_pattern(base: &str) -> String {
    format!("^({})(-[0-9]+)?$", regex::escape(base))
}

/// The base slug for `name`, or `None` when the name is blank.
#[must_use]
pub fn base_slug(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    let base = slugify(name);
    Some(if base.is_empty() {
        FALLBACK_BASE.to_owned()
    } else {
        base
    })
}

/// Pick a unique slug for `name` given the slugs already in use.
///
/// With no slug matching `^(base)(-[0-9]+)?$` (case-insensitive) the base is
/// used as is. With N matches the result is `base-(N+1)`; if that exact value
/// is already taken (a numbering gap left by a rename) the suffix keeps
/// counting up until it is free.
///
/// Returns `None` for a blank name. Required-field validation rejects such
/// records separately.
///
/// # Examples
///
/// ```
/// use delicious_core::assign_slug;
///
/// let slug = assign_slug("Coffee Shop", ["coffee-shop", "coffee-shop-2"]).unwrap();
/// assert_eq!(slug.as_str(), "coffee-shop-3");
/// ```
pub fn assign_slug<'a>(name: &str, existing: impl IntoIterator<Item = &'a str>) -> Option<Slug> {
    let base = base_slug(name)?;

    // The base only holds [a-z0-9-], so the pattern always compiles.
    let pattern = RegexBuilder::new(&collision_pattern(&base))
        .case_insensitive(true)
        .build()
        .ok()?;

    let taken: HashSet<String> = existing
        .into_iter()
        .filter(|slug| pattern.is_match(slug))
        .map(str::to_lowercase)
        .collect();

    if taken.is_empty() {
        return Some(Slug(base));
    }

    let mut suffix = taken.len() + 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken.contains(&candidate) {
            return Some(Slug(candidate));
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assign(name: &str, existing: &[&str]) -> String {
        assign_slug(name, existing.iter().copied())
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Coffee Shop"), "coffee-shop");
        assert_eq!(slugify("  Wes's   Bagels & Lox!  "), "wes-s-bagels-lox");
        assert_eq!(slugify("Café Olé"), "cafe-ole");
    }

    #[test]
    fn test_no_collision_uses_base() {
        assert_eq!(assign("Coffee Shop", &[]), "coffee-shop");
        assert_eq!(assign("Coffee Shop", &["tea-house", "coffee"]), "coffee-shop");
    }

    #[test]
    fn test_collision_appends_count_plus_one() {
        assert_eq!(assign("Coffee Shop", &["coffee-shop"]), "coffee-shop-2");
        assert_eq!(
            assign("Coffee Shop", &["coffee-shop", "coffee-shop-2"]),
            "coffee-shop-3"
        );
    }

    #[test]
    fn test_similar_prefixes_do_not_count() {
        let existing = ["coffee-shop", "coffee-shopper", "coffee-shop-two", "the-coffee-shop"];
        assert_eq!(assign("Coffee Shop", &existing), "coffee-shop-2");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(assign("coffee shop", &["Coffee-Shop"]), "coffee-shop-2");
    }

    #[test]
    fn test_gap_in_numbering_still_unique() {
        // "coffee-shop" was renamed away, leaving only the numbered copy.
        assert_eq!(assign("Coffee Shop", &["coffee-shop-2"]), "coffee-shop-3");
        assert_eq!(
            assign("Coffee Shop", &["coffee-shop", "coffee-shop-3"]),
            "coffee-shop-4"
        );
    }

    #[test]
    fn test_blank_name_is_skipped() {
        assert!(assign_slug("", []).is_none());
        assert!(assign_slug("   ", ["store"]).is_none());
    }

    #[test]
    fn test_punctuation_only_name_falls_back() {
        assert_eq!(assign("!!!", &[]), "store");
        assert_eq!(assign("???", &["store"]), "store-2");
    }

    #[test]
    fn test_distinct_names_get_distinct_slugs() {
        let names = ["Coffee Shop", "Coffee Shop", "Coffee  Shop!", "Tea House", "Tea-House"];
        let mut assigned: Vec<String> = Vec::new();
        for name in names {
            let slug = assign(name, &assigned.iter().map(String::as_str).collect::<Vec<_>>());
            assert!(!assigned.contains(&slug), "duplicate slug {slug}");
            assigned.push(slug);
        }
        assert_eq!(
            assigned,
            vec![
                "coffee-shop",
                "coffee-shop-2",
                "coffee-shop-3",
                "tea-house",
                "tea-house-2"
            ]
        );
    }

    #[test]
    fn test_slug_parse() {
        assert!(Slug::parse("coffee-shop-2").is_ok());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Coffee"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("a b"), Err(SlugError::InvalidCharacters));
    }

    #[test]
    fn test_collision_pattern_escapes_base() {
        assert_eq!(collision_pattern("coffee-shop"), r"^(coffee\-shop)(-[0-9]+)?$");
    }
}
