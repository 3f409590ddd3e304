//! Services against a migrated database.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`dl-cli migrate`)
//! - `DELICIOUS_DATABASE_URL` (or `DATABASE_URL`) pointing at it
//!
//! Run with: cargo test -p delicious-integration-tests -- --ignored

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use delicious_core::{StoreDraft, UserId};
use delicious_integration_tests::test_pool;
use delicious_web::models::{Store, User};
use delicious_web::services::auth::{AuthError, AuthService, RegistrationForm};
use delicious_web::services::stores::{StoreError, StoreService};

const PASSWORD: &str = "correct-horse-battery";

async fn register(pool: &PgPool) -> User {
    let form = RegistrationForm {
        name: "Test User".to_owned(),
        email: format!("test-{}@example.com", Uuid::new_v4()),
        password: PASSWORD.to_owned(),
        password_confirm: PASSWORD.to_owned(),
    };
    AuthService::new(pool)
        .register(&form)
        .await
        .expect("Failed to register")
}

fn draft(name: &str) -> StoreDraft {
    StoreDraft {
        name: name.to_owned(),
        description: "Integration test store".to_owned(),
        tags: vec!["Wifi".to_owned()],
        address: "1 Front St W, Toronto, ON".to_owned(),
        lng: "-79.3832".to_owned(),
        lat: "43.6453".to_owned(),
    }
}

async fn create(pool: &PgPool, name: &str, author: UserId) -> Store {
    StoreService::new(pool)
        .create(&draft(name), None, author)
        .await
        .expect("Failed to create store")
}

async fn rename(pool: &PgPool, store: &Store, name: &str, author: UserId) -> Store {
    StoreService::new(pool)
        .update(store.id, &draft(name), None, author)
        .await
        .expect("Failed to update store")
}

/// A name whose slug no other test run shares.
fn unique_name(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix} {}", id.get(..8).unwrap_or("x"))
}

fn slug_of(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

// ============================================================================
// Password reset
// ============================================================================

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_expired_reset_token_is_cleared_on_lookup() {
    let pool = test_pool().await;
    let user = register(&pool).await;
    let token = Uuid::new_v4().simple().to_string();

    sqlx::query(
        r"
        UPDATE delicious.user
        SET reset_password_token = $2, reset_password_expires = NOW() - INTERVAL '1 hour'
        WHERE id = $1
        ",
    )
    .bind(user.id)
    .bind(&token)
    .execute(&pool)
    .await
    .expect("Failed to expire token");

    let result = AuthService::new(&pool).user_for_reset_token(&token).await;
    assert!(matches!(result, Err(AuthError::InvalidResetToken)));

    let (token_cleared, expiry_cleared): (bool, bool) = sqlx::query_as(
        r"
        SELECT reset_password_token IS NULL, reset_password_expires IS NULL
        FROM delicious.user WHERE id = $1
        ",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .expect("Failed to read user");
    assert!(token_cleared);
    assert!(expiry_cleared);
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_reset_token_redeems_once_under_concurrency() {
    let pool = test_pool().await;
    let user = register(&pool).await;
    let auth = AuthService::new(&pool);

    let (_, token) = auth
        .request_password_reset(user.email.as_str())
        .await
        .expect("Failed to request reset")
        .expect("Account exists");

    let (first, second) = tokio::join!(
        auth.reset_password(&token, "first-new-password", "first-new-password"),
        auth.reset_password(&token, "second-new-password", "second-new-password"),
    );

    let succeeded = [first.is_ok(), second.is_ok()];
    assert_eq!(succeeded.iter().filter(|ok| **ok).count(), 1);
    let failed = if first.is_ok() { second } else { first };
    assert!(matches!(failed, Err(AuthError::InvalidResetToken)));

    let again = auth
        .reset_password(&token, "third-new-password", "third-new-password")
        .await;
    assert!(matches!(again, Err(AuthError::InvalidResetToken)));
}

// ============================================================================
// Slugs
// ============================================================================

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_save_and_rename_follow_slug_rules() {
    let pool = test_pool().await;
    let user = register(&pool).await;
    let name = unique_name("Coffee Shop");
    let base = slug_of(&name);

    let first = create(&pool, &name, user.id).await;
    let second = create(&pool, &name, user.id).await;
    let third = create(&pool, &name, user.id).await;
    assert_eq!(first.slug.as_str(), base);
    assert_eq!(second.slug.as_str(), format!("{base}-2"));
    assert_eq!(third.slug.as_str(), format!("{base}-3"));

    // Same name: the slug is left alone
    let saved = rename(&pool, &second, &name, user.id).await;
    assert_eq!(saved.slug.as_str(), format!("{base}-2"));

    let other = unique_name("Tea House");
    let renamed = rename(&pool, &saved, &other, user.id).await;
    assert_eq!(renamed.slug.as_str(), slug_of(&other));

    // Back to the contested name: two others match, so N+1 is 3, which is taken
    let back = rename(&pool, &renamed, &name, user.id).await;
    assert_eq!(back.slug.as_str(), format!("{base}-4"));
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_rename_does_not_collide_with_own_slug() {
    let pool = test_pool().await;
    let user = register(&pool).await;
    let name = unique_name("Corner Bakery");

    let store = create(&pool, &name, user.id).await;
    let shouted = rename(&pool, &store, &name.to_uppercase(), user.id).await;

    assert_eq!(shouted.slug, store.slug);
    assert_eq!(shouted.name, name.to_uppercase());
}

#[tokio::test]
#[ignore = "Requires migrated database"]
async fn test_concurrent_creates_never_share_a_slug() {
    let pool = test_pool().await;
    let user = register(&pool).await;
    let name = unique_name("Busy Diner");

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let pool = pool.clone();
            let name = name.clone();
            tokio::spawn(async move {
                StoreService::new(&pool)
                    .create(&draft(&name), None, user.id)
                    .await
            })
        })
        .collect();

    let mut slugs = HashSet::new();
    let mut created = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(store) => {
                created += 1;
                assert!(slugs.insert(store.slug.into_inner()), "duplicate slug");
            }
            Err(StoreError::SlugConflict) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(created >= 1);
}
