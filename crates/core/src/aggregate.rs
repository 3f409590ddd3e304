//! Read-only views derived from the store collection.
//!
//! Both views are pure: repositories load stores (and their reviews) and pass
//! them in. Empty input always yields an empty output.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::slug::Slug;
use crate::types::{Rating, StoreId};

/// Minimum number of reviews a store needs before it can be ranked.
pub const MIN_REVIEWS_FOR_RANKING: usize = 2;

/// Maximum number of stores in the top-stores view.
pub const TOP_STORES_LIMIT: usize = 10;

/// How many stores carry a given tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Count the stores carrying each distinct tag.
///
/// Every tag list contributes at most one count per distinct tag, so a store
/// listing `Wifi` twice still counts once. The result is ordered by count
/// (highest first), then by tag name.
///
/// # Examples
///
/// ```
/// use delicious_core::count_tags;
///
/// let stores = vec![vec!["a", "b"], vec!["a"], vec!["c"]];
/// let counts = count_tags(stores);
/// assert_eq!(counts[0].tag, "a");
/// assert_eq!(counts[0].count, 2);
/// ```
pub fn count_tags<I, T, S>(tag_lists: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for tags in tag_lists {
        let distinct: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().to_owned())
            .collect();
        for tag in distinct {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    // BTreeMap already yields tags in name order; the stable sort keeps it.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Anything carrying a star rating, typically a review row.
pub trait Rated {
    fn rating(&self) -> Rating;
}

impl Rated for Rating {
    fn rating(&self) -> Rating {
        *self
    }
}

/// A store joined with all of its reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreWithReviews<R> {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub photo: Option<String>,
    pub reviews: Vec<R>,
}

/// A ranked entry in the top-stores view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStore<R> {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub photo: Option<String>,
    pub reviews: Vec<R>,
    pub average_rating: f64,
}

impl<R: Rated> StoreWithReviews<R> {
    /// Plain arithmetic mean of the review ratings, `None` without reviews.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u64 = self
            .reviews
            .iter()
            .map(|r| u64::from(r.rating().stars()))
            .sum();
        Some(total as f64 / self.reviews.len() as f64)
    }
}

/// Rank stores by average rating.
///
/// Stores with fewer than [`MIN_REVIEWS_FOR_RANKING`] reviews are dropped.
/// The rest are ordered by average rating (highest first), then by review
/// count (highest first), then by store id, and cut to
/// [`TOP_STORES_LIMIT`] entries.
pub fn rank_top_stores<R: Rated>(
    stores: impl IntoIterator<Item = StoreWithReviews<R>>,
) -> Vec<TopStore<R>> {
    let mut ranked: Vec<TopStore<R>> = stores
        .into_iter()
        .filter(|s| s.reviews.len() >= MIN_REVIEWS_FOR_RANKING)
        .filter_map(|s| {
            let average_rating = s.average_rating()?;
            Some(TopStore {
                id: s.id,
                name: s.name,
                slug: s.slug,
                photo: s.photo,
                reviews: s.reviews,
                average_rating,
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked.truncate(TOP_STORES_LIMIT);
    ranked
}

fn compare_ranked<R>(a: &TopStore<R>, b: &TopStore<R>) -> Ordering {
    b.average_rating
        .total_cmp(&a.average_rating)
        .then_with(|| b.reviews.len().cmp(&a.reviews.len()))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(id: i32, ratings: &[i64]) -> StoreWithReviews<Rating> {
        StoreWithReviews {
            id: StoreId::new(id),
            name: format!("Store {id}"),
            slug: Slug::parse(&format!("store-{id}")).unwrap(),
            photo: None,
            reviews: ratings.iter().map(|r| Rating::new(*r).unwrap()).collect(),
        }
    }

    fn pair(tc: &TagCount) -> (&str, u64) {
        (tc.tag.as_str(), tc.count)
    }

    #[test]
    fn test_count_tags_orders_by_count() {
        let counts = count_tags(vec![vec!["a", "b"], vec!["a"], vec!["c"]]);
        let pairs: Vec<_> = counts.iter().map(pair).collect();
        assert_eq!(pairs, vec![("a", 2), ("b", 1), ("c", 1)]);
    }

    #[test]
    fn test_count_tags_one_increment_per_tag() {
        let counts = count_tags(vec![vec!["Wifi", "Licensed", "Vegetarian"]]);
        assert_eq!(counts.len(), 3);
        assert!(counts.iter().all(|c| c.count == 1));
    }

    #[test]
    fn test_count_tags_dedupes_within_store() {
        let counts = count_tags(vec![vec!["Wifi", "Wifi"], vec!["Wifi"]]);
        assert_eq!(counts.iter().map(pair).collect::<Vec<_>>(), vec![("Wifi", 2)]);
    }

    #[test]
    fn test_count_tags_ties_break_by_name() {
        let counts = count_tags(vec![vec!["zebra", "apple"], vec!["mango"]]);
        let tags: Vec<_> = counts.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_count_tags_empty() {
        assert!(count_tags(Vec::<Vec<String>>::new()).is_empty());
        assert!(count_tags(vec![Vec::<String>::new(), Vec::new()]).is_empty());
    }

    #[test]
    fn test_top_stores_requires_two_reviews() {
        let ranked = rank_top_stores(vec![store(1, &[5]), store(2, &[4, 5])]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, StoreId::new(2));
        assert!((ranked[0].average_rating - 4.5).abs() < f64::EPSILON);
        assert_eq!(ranked[0].reviews.len(), 2);
    }

    #[test]
    fn test_top_stores_limit_and_order() {
        let stores: Vec<_> = (1..=50)
            .map(|i| store(i, &[i64::from(i % 5) + 1, 3]))
            .collect();
        let ranked = rank_top_stores(stores);
        assert_eq!(ranked.len(), TOP_STORES_LIMIT);
        assert!(
            ranked
                .windows(2)
                .all(|w| w[0].average_rating >= w[1].average_rating)
        );
        assert!((ranked[0].average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_stores_tie_break() {
        let ranked = rank_top_stores(vec![
            store(3, &[4, 4]),
            store(2, &[4, 4, 4]),
            store(1, &[4, 4]),
        ]);
        let ids: Vec<_> = ranked.iter().map(|s| s.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_top_stores_is_idempotent() {
        let stores: Vec<_> = (1..=20).map(|i| store(i, &[5, 4, i64::from(i % 5) + 1])).collect();
        let first = rank_top_stores(stores.clone());
        let second = rank_top_stores(stores);
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_stores_empty() {
        assert!(rank_top_stores(Vec::<StoreWithReviews<Rating>>::new()).is_empty());
        assert!(rank_top_stores(vec![store(1, &[]), store(2, &[3])]).is_empty());
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(store(1, &[]).average_rating(), None);
        let avg = store(1, &[1, 2]).average_rating().unwrap();
        assert!((avg - 1.5).abs() < f64::EPSILON);
    }
}
