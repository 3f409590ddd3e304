//! End-to-end tests against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`dl-cli migrate`)
//! - The web server running (`cargo run -p delicious-web`)
//!
//! Run with: cargo test -p delicious-integration-tests -- --ignored

use reqwest::{Client, StatusCode, multipart::Form};
use serde_json::Value;
use uuid::Uuid;

use delicious_integration_tests::site_base_url;

/// A client that keeps the session cookie between requests.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a fresh account; the client is logged in afterwards.
async fn register(client: &Client) -> String {
    let email = format!("test-{}@example.com", Uuid::new_v4());
    let resp = client
        .post(format!("{}/register", site_base_url()))
        .form(&[
            ("name", "Test User"),
            ("email", email.as_str()),
            ("password", "correct-horse-battery"),
            ("password-confirm", "correct-horse-battery"),
        ])
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("You are now logged in!"));
    email
}

/// Submit the add-store form and return the path of the new store page.
async fn add_store(client: &Client, name: &str, tag: &str) -> String {
    let form = Form::new()
        .text("name", name.to_owned())
        .text("description", "Integration test store")
        .text("tags", tag.to_owned())
        .text("address", "1 Front St W, Toronto, ON")
        .text("lng", "-79.3832")
        .text("lat", "43.6453");

    let resp = client
        .post(format!("{}/add", site_base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to add store");

    assert_eq!(resp.status(), StatusCode::OK);
    resp.url().path().to_owned()
}

/// Read the store id from the review form on a store page.
async fn store_id(client: &Client, path: &str) -> String {
    let body = client
        .get(format!("{}{path}", site_base_url()))
        .send()
        .await
        .expect("Failed to get store")
        .text()
        .await
        .expect("Failed to read response");

    let start = body.find("/reviews/").expect("review form on store page") + "/reviews/".len();
    body.get(start..)
        .and_then(|rest| rest.split('"').next())
        .expect("store id in review form")
        .to_owned()
}

/// Re-submit the edit form for a store under a (possibly new) name.
async fn edit_store(client: &Client, id: &str, name: &str) {
    let form = Form::new()
        .text("name", name.to_owned())
        .text("description", "Integration test store")
        .text("tags", "Wifi")
        .text("address", "1 Front St W, Toronto, ON")
        .text("lng", "-79.3832")
        .text("lat", "43.6453");

    let resp = client
        .post(format!("{}/add/{id}", site_base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to edit store");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), format!("/stores/{id}/edit"));
}

async fn store_status(client: &Client, slug: &str) -> StatusCode {
    client
        .get(format!("{}/store/{slug}", site_base_url()))
        .send()
        .await
        .expect("Failed to get store")
        .status()
}

fn unique_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("Test Cafe {}", id.get(..8).unwrap_or("x"))
}

fn slug_of(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_same_name_gets_numbered_slugs() {
    let client = client();
    register(&client).await;

    let name = unique_name();
    let slug = slug_of(&name);

    assert_eq!(add_store(&client, &name, "Wifi").await, format!("/store/{slug}"));
    assert_eq!(add_store(&client, &name, "Wifi").await, format!("/store/{slug}-2"));
    assert_eq!(add_store(&client, &name, "Wifi").await, format!("/store/{slug}-3"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_editing_keeps_or_recomputes_slug() {
    let client = client();
    register(&client).await;

    let name = unique_name();
    let slug = slug_of(&name);
    add_store(&client, &name, "Wifi").await;
    let second = add_store(&client, &name, "Wifi").await;
    add_store(&client, &name, "Wifi").await;
    let id = store_id(&client, &second).await;

    // Saving under the same name leaves the slug alone
    edit_store(&client, &id, &name).await;
    assert_eq!(store_status(&client, &format!("{slug}-2")).await, StatusCode::OK);

    let other = format!("Tea House {}", Uuid::new_v4().simple());
    edit_store(&client, &id, &other).await;
    assert_eq!(store_status(&client, &slug_of(&other)).await, StatusCode::OK);
    assert_eq!(
        store_status(&client, &format!("{slug}-2")).await,
        StatusCode::NOT_FOUND
    );

    // Back to the contested name: -2 is free again but the count lands past -3
    edit_store(&client, &id, &name).await;
    assert_eq!(store_status(&client, &format!("{slug}-4")).await, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_new_store_appears_under_its_tag() {
    let client = client();
    register(&client).await;

    let name = unique_name();
    add_store(&client, &name, "Licensed").await;

    let body = client
        .get(format!("{}/tags/Licensed", site_base_url()))
        .send()
        .await
        .expect("Failed to get tag page")
        .text()
        .await
        .expect("Failed to read response");
    assert!(body.contains(&name));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_search_finds_new_store() {
    let client = client();
    register(&client).await;

    let name = unique_name();
    add_store(&client, &name, "Wifi").await;

    let results: Value = client
        .get(format!("{}/api/search", site_base_url()))
        .query(&[("q", name.as_str())])
        .send()
        .await
        .expect("Failed to search")
        .json()
        .await
        .expect("Failed to parse search results");

    let slugs: Vec<&str> = results
        .as_array()
        .expect("search returns an array")
        .iter()
        .filter_map(|r| r["slug"].as_str())
        .collect();
    assert!(slugs.contains(&slug_of(&name).as_str()));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_add_store_requires_login() {
    let client = client();
    let resp = client
        .get(format!("{}/add", site_base_url()))
        .send()
        .await
        .expect("Failed to get add page");

    assert_eq!(resp.url().path(), "/login");
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Oops you must be logged in to do that!"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_top_and_tags_pages_render() {
    let client = client();
    for path in ["/top", "/tags", "/stores", "/map"] {
        let resp = client
            .get(format!("{}{path}", site_base_url()))
            .send()
            .await
            .expect("Failed to get page");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}
