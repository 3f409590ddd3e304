//! Raw user input for stores and reviews, and its validation.
//!
//! Drafts hold exactly what a form or JSON body sent. `validate` trims,
//! normalizes and checks the input, producing either the storable value or
//! every [`FieldError`](crate::validation::FieldError) at once.

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, Rating};
use crate::validation::ValidationErrors;

/// Tags offered as checkboxes on the store form.
pub const KNOWN_TAGS: [&str; 5] = ["Wifi", "Open Late", "Family Friendly", "Vegetarian", "Licensed"];

/// A store's point plus its street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub point: GeoPoint,
    pub address: String,
}

/// Store fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lng: String,
    #[serde(default)]
    pub lat: String,
}

/// A validated store, ready for slug assignment and persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStore {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
}

impl StoreDraft {
    /// Validate and normalize the draft.
    ///
    /// Name, description and address are trimmed; a blank description
    /// becomes `None`. Tags are trimmed, blanks dropped and duplicates
    /// removed, keeping the first occurrence's position.
    ///
    /// # Errors
    ///
    /// Returns every missing or malformed field.
    pub fn validate(&self) -> Result<NewStore, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("name", "Please enter a store name!");
        }

        let address = self.address.trim();
        if address.is_empty() {
            errors.push("address", "You must supply an address!");
        }

        let point = match (parse_coordinate(&self.lng), parse_coordinate(&self.lat)) {
            (Some(lng), Some(lat)) => match GeoPoint::new(lng, lat) {
                Ok(point) => Some(point),
                Err(e) => {
                    errors.push("location", e.to_string());
                    None
                }
            },
            _ => {
                errors.push("location", "You must supply coordinates!");
                None
            }
        };

        let description = self.description.trim();
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_owned());
            }
        }

        match point {
            Some(point) if errors.is_empty() => Ok(NewStore {
                name: name.to_owned(),
                description: (!description.is_empty()).then(|| description.to_owned()),
                tags,
                location: Location {
                    point,
                    address: address.to_owned(),
                },
            }),
            _ => Err(errors),
        }
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Review fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewDraft {
    #[serde(default)]
    pub text: String,
    pub rating: Option<i64>,
}

/// A validated review body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub text: String,
    pub rating: Rating,
}

impl ReviewDraft {
    /// Validate the review text and rating.
    ///
    /// # Errors
    ///
    /// Returns an error for blank text or a missing/out-of-range rating.
    pub fn validate(&self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.push("text", "Your review must have some text!");
        }

        let rating = match self.rating.map(Rating::new) {
            Some(Ok(rating)) => Some(rating),
            Some(Err(e)) => {
                errors.push("rating", e.to_string());
                None
            }
            None => {
                errors.push("rating", "Please choose a rating!");
                None
            }
        };

        match rating {
            Some(rating) if errors.is_empty() => Ok(NewReview {
                text: text.to_owned(),
                rating,
            }),
            _ => Err(errors),
        }
    }
}
