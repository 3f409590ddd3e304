//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Stores, page 1
//! GET  /stores                    - Stores, page 1
//! GET  /stores/page/{page}        - Paginated stores
//! GET  /store/{slug}              - Store detail with reviews
//! GET  /tags                      - Tag counts and every tagged store
//! GET  /tags/{tag}                - Tag counts and the stores for one tag
//! GET  /top                       - Top-rated stores
//! GET  /map                       - Map page
//!
//! # Stores (requires auth)
//! GET  /add                       - Add store form
//! POST /add                       - Create store (multipart)
//! GET  /stores/{id}/edit          - Edit form (owner only)
//! POST /add/{id}                  - Update store (owner only, multipart)
//! POST /reviews/{id}              - Review a store
//! GET  /hearts                    - Hearted stores
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /logout                    - Logout action
//! GET  /register                  - Register page
//! POST /register                  - Register action
//!
//! # Account
//! GET  /account                   - Account form (requires auth)
//! POST /account                   - Save account (requires auth)
//! POST /account/forgot            - Email a reset link
//! GET  /account/reset/{token}     - New password form
//! POST /account/reset/{token}     - Set new password
//!
//! # JSON API
//! GET  /api/search?q=             - Search by name and description
//! GET  /api/stores/near?lat=&lng= - Stores within 10 km
//! POST /api/stores/{id}/heart     - Toggle a heart (requires auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod hearts;
pub mod map;
pub mod reviews;
pub mod stores;
pub mod tags;
pub mod top;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, header::REFERER},
    response::Redirect,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Largest accepted store form, photo included.
const STORE_FORM_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Create the store page routes.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::page))
        .route("/store/{slug}", get(stores::show))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .layer(DefaultBodyLimit::max(STORE_FORM_LIMIT_BYTES))
        .route("/reviews/{id}", post(reviews::create))
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::show))
        .route("/top", get(top::index))
        .route("/map", get(map::index))
        .route("/hearts", get(hearts::index))
}

/// Create the auth routes, rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/account/forgot", post(auth::forgot))
        .route(
            "/account/reset/{token}",
            get(auth::reset_page).post(auth::reset),
        )
        .layer(auth_rate_limiter())
}

/// Create the account routes.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", get(auth::logout))
        .route("/account", get(account::index).post(account::update))
}

/// Create the JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::stores::search))
        .route("/stores/near", get(api::stores::near))
        .layer(api_rate_limiter())
        .route("/stores/{id}/heart", post(api::hearts::toggle))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(store_routes())
        .merge(auth_routes())
        .merge(account_routes())
        .nest("/api", api_routes())
}

/// Redirect to the same-site page in the `Referer` header, or `fallback`.
///
/// Only the path and query of the referer are used, so the redirect never
/// leaves the site.
pub fn redirect_back(headers: &HeaderMap, fallback: &str) -> Redirect {
    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| url::Url::parse(r).ok())
        .map(|url| match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_owned(),
        });

    match target {
        Some(path) => Redirect::to(&path),
        None => Redirect::to(fallback),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{http::header::LOCATION, response::IntoResponse};

    fn location(redirect: Redirect) -> String {
        redirect
            .into_response()
            .headers()
            .get(LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    #[test]
    fn test_redirect_back_uses_referer_path() {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            "http://localhost:7777/store/coffee-shop?x=1".parse().unwrap(),
        );
        assert_eq!(
            location(redirect_back(&headers, "/")),
            "/store/coffee-shop?x=1"
        );
    }

    #[test]
    fn test_redirect_back_never_leaves_site() {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, "https://evil.test/phish".parse().unwrap());
        assert_eq!(location(redirect_back(&headers, "/")), "/phish");
    }

    #[test]
    fn test_redirect_back_falls_back() {
        assert_eq!(location(redirect_back(&HeaderMap::new(), "/stores")), "/stores");
    }
}
