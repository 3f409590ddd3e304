//! Core types for Delicious.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod rating;

pub use email::{Email, EmailError};
pub use geo::{BoundingBox, GeoError, GeoPoint, NEAR_LIMIT, NEAR_RADIUS_METERS, nearest};
pub use id::*;
pub use rating::{Rating, RatingError};
