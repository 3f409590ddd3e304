//! View models shared by page templates.

use tower_sessions::Session;

use delicious_core::{StoreId, TopStore, ValidationErrors};

use crate::middleware::{Flash, take_flashes};
use crate::models::store::photo_url;
use crate::models::{CurrentUser, Review, Store};
use crate::services::stores::StoreService;
use crate::state::AppState;

/// Words of description shown on a listing card.
const EXCERPT_WORDS: usize = 25;

/// Layout data every page template needs.
pub struct Page {
    pub title: String,
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub map_key: Option<String>,
}

impl Page {
    /// Build the layout for a page, taking any queued flashes.
    pub async fn new(
        state: &AppState,
        session: &Session,
        user: Option<CurrentUser>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            user,
            flashes: take_flashes(session).await,
            map_key: state.config().map_key.clone(),
        }
    }

    /// Show validation problems on a re-rendered form.
    #[must_use]
    pub fn with_errors(mut self, errors: &ValidationErrors) -> Self {
        self.flashes.extend(Flash::errors(errors.messages()));
        self
    }

    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }
}

/// A store as shown in a listing grid.
pub struct StoreCard {
    pub id: StoreId,
    pub name: String,
    pub url: String,
    pub edit_url: String,
    pub photo_url: String,
    pub excerpt: String,
    pub hearted: bool,
    pub editable: bool,
    pub signed_in: bool,
}

impl StoreCard {
    #[must_use]
    pub fn new(store: &Store, user: Option<&CurrentUser>, hearts: &[StoreId]) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            url: store.url(),
            edit_url: format!("/stores/{}/edit", store.id),
            photo_url: store.photo_url(),
            excerpt: store.excerpt(EXCERPT_WORDS),
            hearted: hearts.contains(&store.id),
            editable: user.is_some_and(|u| store.is_owned_by(u.id)),
            signed_in: user.is_some(),
        }
    }
}

/// Cards for `stores`, marking the ones the user has hearted.
///
/// # Errors
///
/// Returns an error if the user's hearts cannot be loaded.
pub async fn store_cards(
    service: &StoreService<'_>,
    user: Option<&CurrentUser>,
    stores: &[Store],
) -> crate::error::Result<Vec<StoreCard>> {
    let hearts = match user {
        Some(u) => service.heart_ids(u.id).await?,
        None => Vec::new(),
    };
    Ok(stores
        .iter()
        .map(|s| StoreCard::new(s, user, &hearts))
        .collect())
}

/// One row of the top-stores table.
pub struct TopRow {
    pub rank: usize,
    pub name: String,
    pub url: String,
    pub photo_url: String,
    pub review_count: usize,
    pub average: String,
}

impl TopRow {
    #[must_use]
    pub fn new(rank: usize, store: &TopStore<Review>) -> Self {
        Self {
            rank,
            name: store.name.clone(),
            url: format!("/store/{}", store.slug),
            photo_url: photo_url(store.photo.as_deref()),
            review_count: store.reviews.len(),
            average: format!("{:.1}", store.average_rating),
        }
    }
}

/// A tag checkbox on the store form.
pub struct TagOption {
    pub name: &'static str,
    pub checked: bool,
}

/// The known tags, checked when present in `selected`.
#[must_use]
pub fn tag_options(selected: &[String]) -> Vec<TagOption> {
    delicious_core::KNOWN_TAGS
        .iter()
        .map(|&name| TagOption {
            name,
            checked: selected.iter().any(|t| t == name),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use delicious_core::{Email, GeoPoint, Location, Rating, ReviewId, Slug, UserId};

    fn store(author: i32) -> Store {
        Store {
            id: StoreId::new(7),
            name: "Coffee Shop".to_owned(),
            slug: Slug::parse("coffee-shop").unwrap(),
            description: None,
            tags: Vec::new(),
            location: Location {
                point: GeoPoint::new(-79.38, 43.65).unwrap(),
                address: "1 Front St".to_owned(),
            },
            photo: None,
            author_id: UserId::new(author),
            created_at: Utc::now(),
        }
    }

    fn user(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("wes@example.com").unwrap(),
            name: "Wes".to_owned(),
        }
    }

    #[test]
    fn test_card_for_owner() {
        let owner = user(1);
        let card = StoreCard::new(&store(1), Some(&owner), &[StoreId::new(7)]);
        assert!(card.editable);
        assert!(card.hearted);
        assert_eq!(card.url, "/store/coffee-shop");
        assert_eq!(card.edit_url, "/stores/7/edit");
    }

    #[test]
    fn test_card_for_guest() {
        let card = StoreCard::new(&store(1), None, &[]);
        assert!(!card.editable);
        assert!(!card.hearted);
        assert!(!card.signed_in);
    }

    #[test]
    fn test_top_row_formats_average() {
        let review = |rating| Review {
            id: ReviewId::new(1),
            store_id: StoreId::new(7),
            author_id: UserId::new(1),
            author_name: None,
            text: "ok".to_owned(),
            rating: Rating::new(rating).unwrap(),
            created_at: Utc::now(),
        };
        let top = TopStore {
            id: StoreId::new(7),
            name: "Coffee Shop".to_owned(),
            slug: Slug::parse("coffee-shop").unwrap(),
            photo: None,
            reviews: vec![review(5), review(4)],
            average_rating: 4.5,
        };
        let row = TopRow::new(1, &top);
        assert_eq!(row.average, "4.5");
        assert_eq!(row.review_count, 2);
        assert_eq!(row.photo_url, "/static/images/store.png");
    }

    #[test]
    fn test_tag_options_marks_selected() {
        let options = tag_options(&["Wifi".to_owned()]);
        assert_eq!(options.len(), delicious_core::KNOWN_TAGS.len());
        assert!(options.iter().find(|o| o.name == "Wifi").unwrap().checked);
        assert!(!options.iter().find(|o| o.name == "Licensed").unwrap().checked);
    }
}
