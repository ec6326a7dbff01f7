//! Device directory and QR credential routes.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_get_device_scoped_to_owner() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let stranger = app.actor("user");
    let device_id = app.provision(&owner).await;
    let path = format!("/api/devices/{device_id}");

    let own = app.request("GET", &path, None, Some(&owner.token)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["device_id"], device_id.as_str());
    assert_eq!(own.body["data"]["tracking_state"], "disabled");

    let other = app.request("GET", &path, None, Some(&stranger.token)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let listed = app
        .request("GET", "/api/devices", None, Some(&stranger.token))
        .await;
    assert_eq!(listed.body["data"]["total_items"], 0);
}

#[tokio::test]
async fn test_device_id_is_case_insensitive() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    let response = app
        .request(
            "GET",
            &format!("/api/devices/{}", device_id.to_lowercase()),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["device_id"], device_id.as_str());
}

#[tokio::test]
async fn test_malformed_and_unknown_device_ids() {
    let app = TestApp::new();
    let admin = app.actor("admin");

    let malformed = app
        .request("GET", "/api/devices/DEV-1", None, Some(&admin.token))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .request("GET", "/api/devices/DEV-ABCD2345", None, Some(&admin.token))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_tracking_toggle() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;
    let start = format!("/api/devices/{device_id}/tracking/start");
    let stop = format!("/api/devices/{device_id}/tracking/stop");

    let started = app.request("POST", &start, None, Some(&owner.token)).await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.body["data"]["tracking_enabled"], true);

    let again = app.request("POST", &start, None, Some(&owner.token)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let stopped = app.request("POST", &stop, None, Some(&owner.token)).await;
    assert_eq!(stopped.status, StatusCode::OK);
    assert_eq!(stopped.body["data"]["tracking_state"], "disabled");
}

#[tokio::test]
async fn test_telemetry_brings_device_online() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    app.request(
        "POST",
        &format!("/api/devices/{device_id}/tracking/start"),
        None,
        Some(&owner.token),
    )
    .await;

    let response = app
        .request(
            "POST",
            &format!("/api/devices/{device_id}/telemetry"),
            Some(json!({ "battery_level": 80, "signal_strength": 65 })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["battery_level"], 80);
    assert_eq!(response.body["data"]["tracking_state"], "online");

    let invalid = app
        .request(
            "POST",
            &format!("/api/devices/{device_id}/telemetry"),
            Some(json!({ "battery_level": 140 })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_transitions() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let manager = app.actor("manager");
    let device_id = app.provision(&owner).await;
    let path = format!("/api/devices/{device_id}/status");

    let by_owner = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "active" })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(by_owner.status, StatusCode::FORBIDDEN);

    let activated = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "active" })),
            Some(&manager.token),
        )
        .await;
    assert_eq!(activated.status, StatusCode::OK);
    assert_eq!(activated.body["data"]["status"], "active");

    let same = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "active" })),
            Some(&manager.token),
        )
        .await;
    assert_eq!(same.status, StatusCode::BAD_REQUEST);

    let back = app
        .request(
            "PUT",
            &path,
            Some(json!({ "status": "approved" })),
            Some(&manager.token),
        )
        .await;
    assert_eq!(back.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_device() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let admin = app.actor("admin");
    let device_id = app.provision(&owner).await;
    let path = format!("/api/devices/{device_id}");

    let by_owner = app.request("DELETE", &path, None, Some(&owner.token)).await;
    assert_eq!(by_owner.status, StatusCode::FORBIDDEN);

    let deleted = app.request("DELETE", &path, None, Some(&admin.token)).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.request("GET", &path, None, Some(&admin.token)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_round_trip() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let stranger = app.actor("user");
    let device_id = app.provision(&owner).await;

    let credential = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/credential"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(credential.status, StatusCode::OK);
    assert_eq!(credential.body["data"]["is_valid"], true);
    let payload = credential.body["data"]["payload"]
        .as_str()
        .expect("payload")
        .to_string();

    let scanned = app
        .request(
            "POST",
            "/api/scan",
            Some(json!({ "payload": payload })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(scanned.status, StatusCode::OK);
    assert_eq!(scanned.body["data"]["device_id"], device_id.as_str());
    assert_eq!(scanned.body["data"]["owner_id"], owner.id.to_string());

    let by_stranger = app
        .request(
            "POST",
            "/api/scan",
            Some(json!({ "payload": payload })),
            Some(&stranger.token),
        )
        .await;
    assert_eq!(by_stranger.status, StatusCode::FORBIDDEN);

    let garbage = app
        .request(
            "POST",
            "/api/scan",
            Some(json!({ "payload": "%%%" })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regenerate_supersedes_old_payload() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    let before = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/credential"),
            None,
            Some(&owner.token),
        )
        .await;
    let old_payload = before.body["data"]["payload"]
        .as_str()
        .expect("payload")
        .to_string();

    let regenerated = app
        .request(
            "POST",
            &format!("/api/devices/{device_id}/credential/regenerate?validity_days=7"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(regenerated.status, StatusCode::OK);
    let new_payload = regenerated.body["data"]["payload"]
        .as_str()
        .expect("payload");
    assert_ne!(new_payload, old_payload);

    let stale = app
        .request(
            "POST",
            "/api/scan",
            Some(json!({ "payload": old_payload })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(stale.status, StatusCode::FORBIDDEN);
    assert_eq!(stale.error_code(), "CREDENTIAL_INACTIVE");

    let fresh = app
        .request(
            "POST",
            "/api/scan",
            Some(json!({ "payload": new_payload })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(fresh.status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivate_credential() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let manager = app.actor("manager");
    let device_id = app.provision(&owner).await;
    let deactivate = format!("/api/devices/{device_id}/credential/deactivate");
    let validate = format!("/api/devices/{device_id}/credential/validate");

    let valid = app
        .request("GET", &validate, None, Some(&owner.token))
        .await;
    assert_eq!(valid.status, StatusCode::OK);
    assert_eq!(valid.body["data"]["deviceId"], device_id.as_str());

    let by_owner = app
        .request("POST", &deactivate, None, Some(&owner.token))
        .await;
    assert_eq!(by_owner.status, StatusCode::FORBIDDEN);

    let deactivated = app
        .request("POST", &deactivate, None, Some(&manager.token))
        .await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.body["data"]["is_active"], false);

    let invalid = app
        .request("GET", &validate, None, Some(&owner.token))
        .await;
    assert_eq!(invalid.status, StatusCode::FORBIDDEN);
    assert_eq!(invalid.error_code(), "CREDENTIAL_INACTIVE");
}
