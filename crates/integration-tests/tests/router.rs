//! The assembled router, driven in-process.
//!
//! Every request here is answered without touching the database: the pool
//! connects lazily and none of these handlers query it.

#![allow(clippy::unwrap_used)]

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

use delicious_integration_tests::test_state;

async fn send(request: Request<Body>) -> Response {
    let app = delicious_web::app(test_state());
    app.oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_ok() {
    let response = send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let response = send(get("/health")).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(
        headers[header::CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap()
            .contains("maps.googleapis.com")
    );
    assert!(!headers["x-request-id"].is_empty());
}

#[tokio::test]
async fn test_upstream_request_id_is_kept() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let response = send(get("/no/such/page")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_search_returns_no_results() {
    let response = send(get("/api/search?q=%20%20")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_near_rejects_out_of_range_coordinates() {
    let response = send(get("/api/stores/near?lat=100&lng=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_near_requires_coordinates() {
    let response = send(get("/api/stores/near?lat=43.6")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_heart_without_login_is_unauthorized() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/stores/1/heart")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
