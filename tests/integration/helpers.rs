//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use geotrack_api::{AppState, Stores, build_app};
use geotrack_core::config::AppConfig;
use geotrack_database::MemoryStore;
use geotrack_service::LogNotifier;

/// Secret shared by the test app and the token helper.
pub const TEST_SECRET: &str = "integration-test-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
}

/// An actor with a signed token.
#[derive(Debug, Clone)]
pub struct Actor {
    /// User id.
    pub id: Uuid,
    /// Bearer token.
    pub token: String,
}

impl TestApp {
    /// Create a new test application backed by a fresh memory store
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = TEST_SECRET.to_string();

        let store = Arc::new(MemoryStore::new());
        let stores = Stores {
            devices: store.clone(),
            requests: store.clone(),
            locations: store,
        };
        let state = AppState::new(config.clone(), stores, Arc::new(LogNotifier))
            .expect("Failed to build app state");

        Self {
            router: build_app(state),
            config,
        }
    }

    /// A new actor with the given role.
    pub fn actor(&self, role: &str) -> Actor {
        let id = Uuid::new_v4();
        Actor {
            id,
            token: sign_token(id, role, Duration::hours(1), TEST_SECRET),
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Submit a request with the given item names as `requester`.
    pub async fn submit(&self, requester: &Actor, names: &[&str]) -> String {
        let items: Vec<Value> = names
            .iter()
            .map(|name| json!({ "name": name, "purpose": "Fleet tracking" }))
            .collect();
        let response = self
            .request(
                "POST",
                "/api/requests",
                Some(json!({ "items": items, "priority": "high" })),
                Some(&requester.token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("request id")
            .to_string()
    }

    /// Provision one device owned by `owner` and return its id.
    pub async fn provision(&self, owner: &Actor) -> String {
        let manager = self.actor("manager");
        let request_id = self.submit(owner, &["Van tracker"]).await;
        let response = self
            .request(
                "POST",
                &format!("/api/requests/{request_id}/items/0/approve"),
                None,
                Some(&manager.token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"]["device"]["device_id"]
            .as_str()
            .expect("device id")
            .to_string()
    }
}

/// Sign an HS256 token the way the identity provider does.
pub fn sign_token(user_id: Uuid, role: &str, ttl: Duration, secret: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "role": role,
        "name": "Test User",
        "iat": Utc::now().timestamp(),
        "exp": (Utc::now() + ttl).timestamp(),
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `error` code of an error body.
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
