//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Location, Slug, StoreId, UserId};

/// A store listed in the directory (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    /// Unique URL identifier, assigned from the name.
    pub slug: Slug,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    /// File name of the uploaded photo, relative to the upload directory.
    pub photo: Option<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Whether `user` may edit this store.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author_id == user
    }

    /// Public path of the store's detail page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/store/{}", self.slug)
    }

    /// Public path of the photo, falling back to the placeholder image.
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }

    /// The first `words` words of the description, for listing cards.
    #[must_use]
    pub fn excerpt(&self, words: usize) -> String {
        self.description
            .as_deref()
            .map(|d| d.split_whitespace().take(words).collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Public path for a stored photo file name.
#[must_use]
pub fn photo_url(photo: Option<&str>) -> String {
    photo.map_or_else(
        || "/static/images/store.png".to_owned(),
        |p| format!("/uploads/{p}"),
    )
}
