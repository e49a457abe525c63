//! HTTP tests for the admin endpoints: auth gating, issue, revoke,
//! list, and inspect.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    let app = test_app(create_test_state());

    // No Authorization header at all.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/admin/licenses/issue")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong token.
    let response =
        post_json_with_token(&app, "/v1/admin/licenses/issue", json!({}), "wrong-token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_are_503_without_configured_token() {
    let mut state = create_test_state();
    state.admin_token = None;
    let app = test_app(state);

    let response =
        post_json_with_token(&app, "/v1/admin/licenses/issue", json!({}), TEST_ADMIN_TOKEN).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert!(
        body["details"]
            .as_str()
            .unwrap()
            .contains("LICENSE_SERVER_ADMIN_TOKEN")
    );
}

#[tokio::test]
async fn issue_returns_plaintext_key_once() {
    let app = test_app(create_test_state());

    let body = expect_json(
        post_json_admin(
            &app,
            "/v1/admin/licenses/issue",
            json!({ "plan": "studio", "maxActivations": 3, "days": 30 }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    assert_eq!(body["success"], true);
    let license = &body["license"];
    let key = license["licenseKey"].as_str().unwrap();
    assert!(key.starts_with("AK-"));
    assert_eq!(key.len(), "AK-XXXX-XXXX-XXXX-XXXX".len());
    assert_eq!(license["plan"], "studio");
    assert_eq!(license["maxActivations"], 3);
    assert!(license["expiresAt"].as_i64().unwrap() > chrono::Utc::now().timestamp());

    // The hint masks the key: first and last group only.
    let hint = license["keyHint"].as_str().unwrap();
    assert!(hint.contains("..."));
    assert_ne!(hint, key);

    // Listing never echoes the key back.
    let list = expect_json(get_admin(&app, "/v1/admin/licenses").await, StatusCode::OK).await;
    assert!(!list.to_string().contains(key));
}

#[tokio::test]
async fn issue_with_duplicate_key_is_409() {
    let app = test_app(create_test_state());
    let req = json!({ "licenseKey": "AK-AAAA-BBBB-CCCC-DDDD" });

    let first = post_json_admin(&app, "/v1/admin/licenses/issue", req.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json_admin(&app, "/v1/admin/licenses/issue", req).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn revoke_flow_over_http() {
    let state = create_test_state();
    let issued = issue_test_license(&state, IssueLicense::default());
    let app = test_app(state);

    let body = expect_json(
        post_json_admin(
            &app,
            "/v1/admin/licenses/revoke",
            json!({ "licenseKey": issued.license_key, "reason": "refund" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updated"], true);

    // Unknown key is still a 200, reported as not updated.
    let body = expect_json(
        post_json_admin(
            &app,
            "/v1/admin/licenses/revoke",
            json!({ "licenseKey": "AK-ZZZZ-ZZZZ-ZZZZ-ZZZZ" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["updated"], false);

    // The revoked license now fails activation.
    let body = expect_json(
        post_json(
            &app,
            "/v1/licenses/activate",
            json!({ "licenseKey": issued.license_key, "machineId": "machine-a" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["status"], "invalid");
}

#[tokio::test]
async fn list_reports_activation_counts() {
    let state = create_test_state();
    let issued = issue_test_license(&state, IssueLicense::default());
    let app = test_app(state);

    expect_json(
        post_json(
            &app,
            "/v1/licenses/activate",
            json!({ "licenseKey": issued.license_key, "machineId": "machine-a" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let body = expect_json(
        get_admin(&app, "/v1/admin/licenses?limit=50").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["success"], true);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["activationCount"], 1);
    assert_eq!(items[0]["keyHint"], issued.key_hint);
    assert!(items[0].get("keyHash").is_none());
}

#[tokio::test]
async fn inspect_returns_details_or_404() {
    let state = create_test_state();
    let issued = issue_test_license(&state, IssueLicense::default());
    let app = test_app(state);

    expect_json(
        post_json(
            &app,
            "/v1/licenses/activate",
            json!({ "licenseKey": issued.license_key, "machineId": "machine-a" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let uri = format!("/v1/admin/licenses/inspect?licenseKey={}", issued.license_key);
    let body = expect_json(get_admin(&app, &uri).await, StatusCode::OK).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["item"]["id"], issued.id.as_str());
    assert_eq!(body["item"]["activations"][0]["machineId"], "machine-a");

    let body = expect_json(
        get_admin(&app, "/v1/admin/licenses/inspect?licenseKey=AK-ZZZZ-ZZZZ-ZZZZ-ZZZZ").await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "License not found.");
}
