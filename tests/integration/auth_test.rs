//! Health and bearer token checks.

use axum::http::StatusCode;
use chrono::Duration;
use uuid::Uuid;

use crate::helpers::{TEST_SECRET, TestApp, sign_token};

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["store"], "memory");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/devices", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "AUTHENTICATION");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .request("GET", "/api/devices", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::new();
    let token = sign_token(Uuid::new_v4(), "user", Duration::hours(-2), TEST_SECRET);
    let response = app.request("GET", "/api/devices", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = TestApp::new();
    let token = sign_token(
        Uuid::new_v4(),
        "admin",
        Duration::hours(1),
        "some-other-secret",
    );
    let response = app.request("GET", "/api/devices", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_role_is_unauthorized() {
    let app = TestApp::new();
    let token = sign_token(Uuid::new_v4(), "superuser", Duration::hours(1), TEST_SECRET);
    let response = app.request("GET", "/api/devices", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let user = app.actor("user");
    let response = app
        .request("GET", "/api/nothing-here", None, Some(&user.token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
