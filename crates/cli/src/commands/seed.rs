//! Load or remove sample data.
//!
//! # Usage
//!
//! ```bash
//! # Load users, stores and reviews from crates/cli/data
//! dl-cli seed load
//!
//! # Load from another directory
//! dl-cli seed load --dir ./my-data
//!
//! # Remove every user, store, review and heart
//! dl-cli seed delete
//! ```
//!
//! The data directory holds `users.json`, `stores.json` and `reviews.json`.
//! Stores and reviews name their author by email; reviews name their store
//! by store name. Everything goes through the same services as the site, so
//! passwords are hashed and slugs assigned exactly as they are for a signup
//! or a submitted form.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use delicious_core::{ReviewDraft, StoreDraft, StoreId, UserId};
use delicious_web::services::auth::{AuthService, RegistrationForm};
use delicious_web::services::stores::StoreService;

use super::connect;

#[derive(Debug, Deserialize)]
struct SeedUser {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SeedStore {
    author: String,
    #[serde(flatten)]
    draft: StoreDraft,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    author: String,
    store: String,
    #[serde(flatten)]
    draft: ReviewDraft,
}

async fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, Box<dyn std::error::Error>> {
    let path = dir.join(file);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))?)
}

/// Load sample users, stores and reviews from `dir`.
///
/// # Errors
///
/// Returns an error if a file is missing or malformed, a record fails
/// validation, a record names an unknown author or store, or the database
/// rejects a write.
pub async fn load(dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dir = Path::new(dir);

    // Parse everything before touching the database
    let users: Vec<SeedUser> = read_json(dir, "users.json").await?;
    let stores: Vec<SeedStore> = read_json(dir, "stores.json").await?;
    let reviews: Vec<SeedReview> = read_json(dir, "reviews.json").await?;
    info!(
        users = users.len(),
        stores = stores.len(),
        reviews = reviews.len(),
        "Parsed sample data"
    );

    let pool = connect().await?;
    let auth = AuthService::new(&pool);
    let service = StoreService::new(&pool);

    let mut user_ids: HashMap<String, UserId> = HashMap::new();
    for user in users {
        let form = RegistrationForm {
            name: user.name,
            email: user.email.clone(),
            password: user.password.clone(),
            password_confirm: user.password,
        };
        let created = auth
            .register(&form)
            .await
            .map_err(|e| format!("user {}: {e}", user.email))?;
        user_ids.insert(user.email.to_lowercase(), created.id);
    }
    info!(count = user_ids.len(), "Created users");

    let mut store_ids: HashMap<String, StoreId> = HashMap::new();
    for store in stores {
        let author = *user_ids
            .get(&store.author.to_lowercase())
            .ok_or_else(|| format!("store {}: unknown author {}", store.draft.name, store.author))?;
        let created = service
            .create(&store.draft, store.photo.as_deref(), author)
            .await
            .map_err(|e| format!("store {}: {e}", store.draft.name))?;
        info!(name = %created.name, slug = %created.slug, "Created store");
        store_ids.insert(created.name, created.id);
    }

    for review in &reviews {
        let author = *user_ids
            .get(&review.author.to_lowercase())
            .ok_or_else(|| format!("review: unknown author {}", review.author))?;
        let store = *store_ids
            .get(&review.store)
            .ok_or_else(|| format!("review: unknown store {}", review.store))?;
        service
            .add_review(store, author, &review.draft)
            .await
            .map_err(|e| format!("review of {}: {e}", review.store))?;
    }
    info!(count = reviews.len(), "Created reviews");

    info!("Sample data loaded");
    Ok(())
}

/// Remove every user, store, review and heart.
///
/// Sessions are left alone; they expire on their own and no longer resolve
/// to a user.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn delete() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    info!("Deleting sample data...");
    sqlx::query(
        r"
        TRUNCATE delicious.heart, delicious.review, delicious.store, delicious.user
        RESTART IDENTITY
        ",
    )
    .execute(&pool)
    .await?;

    info!("Sample data deleted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_record_flattens_draft() {
        let store: SeedStore = serde_json::from_str(
            r#"{
                "author": "wes@example.com",
                "name": "Coffee Shop",
                "description": "Good coffee",
                "tags": ["Wifi"],
                "address": "1 Front St",
                "lng": "-79.38",
                "lat": "43.65"
            }"#,
        )
        .unwrap();
        assert_eq!(store.author, "wes@example.com");
        assert_eq!(store.draft.name, "Coffee Shop");
        assert_eq!(store.draft.tags, vec!["Wifi".to_owned()]);
        assert!(store.photo.is_none());
        assert!(store.draft.validate().is_ok());
    }

    #[test]
    fn test_bundled_data_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let users: Vec<SeedUser> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("users.json")).unwrap()).unwrap();
        let stores: Vec<SeedStore> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("stores.json")).unwrap()).unwrap();
        let reviews: Vec<SeedReview> =
            serde_json::from_str(&std::fs::read_to_string(dir.join("reviews.json")).unwrap()).unwrap();

        let emails: Vec<String> = users.iter().map(|u| u.email.to_lowercase()).collect();
        for store in &stores {
            assert!(store.draft.validate().is_ok(), "{}", store.draft.name);
            assert!(emails.contains(&store.author.to_lowercase()));
        }
        for review in &reviews {
            assert!(review.draft.validate().is_ok());
            assert!(stores.iter().any(|s| s.draft.name == review.store));
        }
    }
}
