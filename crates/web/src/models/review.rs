//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{Rated, Rating, ReviewId, StoreId, UserId};

/// A review left on a store, with its author's name joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub store_id: StoreId,
    pub author_id: UserId,
    /// `None` when the author row no longer exists.
    pub author_name: Option<String>,
    pub text: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

impl Rated for Review {
    fn rating(&self) -> Rating {
        self.rating
    }
}

impl Review {
    /// Filled and empty stars, e.g. `★★★☆☆` for a 3.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.stars());
        let empty = usize::from(Rating::MAX) - filled;
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stars() {
        let review = Review {
            id: ReviewId::new(1),
            store_id: StoreId::new(1),
            author_id: UserId::new(1),
            author_name: None,
            text: "ok".to_owned(),
            rating: Rating::new(3).unwrap(),
            created_at: Utc::now(),
        };
        assert_eq!(review.stars(), "★★★☆☆");
    }
}
