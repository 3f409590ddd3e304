//! Delicious Core - Shared types and store-directory logic.
//!
//! This crate provides the types and pure logic used across all Delicious components:
//! - `web` - The store directory web application
//! - `cli` - Command-line tools for migrations and sample data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database access,
//! no HTTP clients. Repositories load rows and hand them to the functions here, which
//! keeps the interesting rules testable without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, ratings and coordinates
//! - [`slug`] - URL slug derivation and collision-free assignment
//! - [`aggregate`] - Tag frequency and top-rated store views
//! - [`draft`] - Raw form input and its validation into storable values
//! - [`validation`] - Structured field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aggregate;
pub mod draft;
pub mod slug;
pub mod types;
pub mod validation;

pub use aggregate::{
    MIN_REVIEWS_FOR_RANKING, Rated, StoreWithReviews, TOP_STORES_LIMIT, TagCount, TopStore,
    count_tags, rank_top_stores,
};
pub use draft::{KNOWN_TAGS, Location, NewReview, NewStore, ReviewDraft, StoreDraft};
pub use slug::{Slug, SlugError, assign_slug, slugify};
pub use types::*;
pub use validation::{FieldError, ValidationErrors};
