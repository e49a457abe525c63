//! Test utilities and fixtures for Ariakey integration tests

#![allow(dead_code)]
#![allow(unused_imports)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;
use tower::ServiceExt;

pub use ariakey::db::{AppState, DbPool, init_db, queries};
pub use ariakey::handlers;
pub use ariakey::keys::{self, KeyPepper};
pub use ariakey::models::*;

pub const TEST_PEPPER: &str = "unit-test-pepper-0123456789";
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";
pub const TEST_PRODUCT: &str = "ariakey-pro";

pub fn test_pepper() -> KeyPepper {
    KeyPepper::new(TEST_PEPPER).expect("test pepper should be long enough")
}

/// In-memory pool capped at one connection so every query sees the same
/// database (each in-memory SQLite connection is otherwise distinct).
pub fn setup_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.pragma_update(None, "foreign_keys", "ON"));
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build test pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    pool
}

pub fn create_test_state() -> AppState {
    AppState {
        db: setup_test_pool(),
        pepper: test_pepper(),
        default_product_id: TEST_PRODUCT.to_string(),
        offline_grace_hours: 168,
        admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
    }
}

pub fn test_app(state: AppState) -> axum::Router {
    handlers::router(state)
}

/// Issue a license straight through the store layer and return it with
/// its plaintext key.
pub fn issue_test_license(state: &AppState, input: IssueLicense) -> IssuedLicense {
    let conn = state.db.get().expect("Failed to get connection");
    queries::issue_license(&conn, &state.pepper, &state.default_product_id, &input)
        .expect("Failed to issue test license")
}

pub async fn post_json(app: &axum::Router, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_json_admin(app: &axum::Router, uri: &str, body: Value) -> Response<Body> {
    post_json_with_token(app, uri, body, TEST_ADMIN_TOKEN).await
}

pub async fn post_json_with_token(
    app: &axum::Router,
    uri: &str,
    body: Value,
    token: &str,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_admin(app: &axum::Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", TEST_ADMIN_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_plain(app: &axum::Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response should be valid JSON")
}

pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    json_body(response).await
}

pub fn past_timestamp(days: i64) -> i64 {
    chrono::Utc::now().timestamp() - days * 86_400
}

pub fn future_timestamp(days: i64) -> i64 {
    chrono::Utc::now().timestamp() + days * 86_400
}
