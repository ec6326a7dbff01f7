//! Request submission and per-item decisions.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_submit_request() {
    let app = TestApp::new();
    let user = app.actor("user");

    let response = app
        .request(
            "POST",
            "/api/requests",
            Some(json!({
                "items": [
                    { "name": "Van 1", "purpose": "Deliveries", "category": "vehicle" },
                    { "name": "Van 2", "purpose": "Deliveries" },
                ],
                "department": "  Logistics  ",
            })),
            Some(&user.token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let data = &response.body["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["priority"], "normal");
    assert_eq!(data["department"], "Logistics");
    assert_eq!(data["requester_id"], user.id.to_string());
    assert_eq!(data["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(data["items"][0]["status"], "pending");
}

#[tokio::test]
async fn test_submit_rejects_empty_items() {
    let app = TestApp::new();
    let user = app.actor("user");

    let response = app
        .request(
            "POST",
            "/api/requests",
            Some(json!({ "items": [] })),
            Some(&user.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_submit_rejects_malformed_body() {
    let app = TestApp::new();
    let user = app.actor("user");

    let response = app
        .request(
            "POST",
            "/api/requests",
            Some(json!({ "items": "two vans" })),
            Some(&user.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_approve_provisions_device() {
    let app = TestApp::new();
    let user = app.actor("user");
    let manager = app.actor("manager");
    let request_id = app.submit(&user, &["Van 1", "Van 2"]).await;

    let response = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/1/approve?validity_days=30"),
            None,
            Some(&manager.token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["request"]["status"], "partially_approved");
    assert_eq!(data["request"]["items"][1]["status"], "approved");
    assert_eq!(data["request"]["items"][0]["status"], "pending");

    let device = &data["device"];
    assert_eq!(device["name"], "Van 2");
    assert_eq!(device["status"], "approved");
    assert_eq!(device["owner_id"], user.id.to_string());
    assert_eq!(device["approved_by"], manager.id.to_string());
    assert_eq!(device["line_item_index"], 1);
    assert_eq!(device["tracking_enabled"], false);
    assert!(device["device_id"].as_str().is_some_and(|id| id.starts_with("DEV-")));

    assert_eq!(data["qr_payload"]["deviceId"], device["device_id"]);
    assert_eq!(data["qr_payload"]["status"], "active");
    assert_eq!(
        data["request"]["items"][1]["device_id"],
        device["device_id"]
    );
}

#[tokio::test]
async fn test_user_cannot_approve() {
    let app = TestApp::new();
    let user = app.actor("user");
    let request_id = app.submit(&user, &["Van"]).await;

    let response = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/0/approve"),
            None,
            Some(&user.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "AUTHORIZATION");
}

#[tokio::test]
async fn test_second_decision_conflicts() {
    let app = TestApp::new();
    let user = app.actor("user");
    let admin = app.actor("admin");
    let request_id = app.submit(&user, &["Van"]).await;
    let approve = format!("/api/requests/{request_id}/items/0/approve");

    let first = app
        .request("POST", &approve, None, Some(&admin.token))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let again = app
        .request("POST", &approve, None, Some(&admin.token))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error_code(), "ALREADY_PROCESSED");

    let reject = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/0/reject"),
            Some(json!({ "reason": "Changed my mind" })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(reject.status, StatusCode::CONFLICT);

    let devices = app
        .request("GET", "/api/devices", None, Some(&admin.token))
        .await;
    assert_eq!(devices.body["data"]["total_items"], 1);
}

#[tokio::test]
async fn test_reject_and_mixed_outcome() {
    let app = TestApp::new();
    let user = app.actor("user");
    let manager = app.actor("manager");
    let request_id = app.submit(&user, &["A", "B", "C"]).await;

    for index in [0, 1] {
        let response = app
            .request(
                "POST",
                &format!("/api/requests/{request_id}/items/{index}/approve"),
                None,
                Some(&manager.token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/2/reject"),
            Some(json!({ "reason": "Budget exhausted" })),
            Some(&manager.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status"], "partially_approved");
    assert_eq!(data["items"][2]["status"], "rejected");
    assert_eq!(data["items"][2]["rejection_reason"], "Budget exhausted");
    assert_eq!(data["items"][2]["rejected_by"], manager.id.to_string());
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = TestApp::new();
    let user = app.actor("user");
    let manager = app.actor("manager");
    let request_id = app.submit(&user, &["Van"]).await;
    let path = format!("/api/requests/{request_id}/items/0/reject");

    let missing = app.request("POST", &path, None, Some(&manager.token)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let blank = app
        .request(
            "POST",
            &path,
            Some(json!({ "reason": "   " })),
            Some(&manager.token),
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_item_index_out_of_range() {
    let app = TestApp::new();
    let user = app.actor("user");
    let manager = app.actor("manager");
    let request_id = app.submit(&user, &["Van"]).await;

    let response = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/5/approve"),
            None,
            Some(&manager.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validity_out_of_range() {
    let app = TestApp::new();
    let user = app.actor("user");
    let manager = app.actor("manager");
    let request_id = app.submit(&user, &["Van"]).await;

    let response = app
        .request(
            "POST",
            &format!("/api/requests/{request_id}/items/0/approve?validity_days=0"),
            None,
            Some(&manager.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_visibility() {
    let app = TestApp::new();
    let alice = app.actor("user");
    let bob = app.actor("user");
    let manager = app.actor("manager");
    let alice_request = app.submit(&alice, &["Van"]).await;
    app.submit(&bob, &["Truck"]).await;

    let own = app
        .request("GET", "/api/requests", None, Some(&alice.token))
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["total_items"], 1);
    assert_eq!(own.body["data"]["items"][0]["id"], alice_request);

    let all = app
        .request("GET", "/api/requests", None, Some(&manager.token))
        .await;
    assert_eq!(all.body["data"]["total_items"], 2);

    let pending = app
        .request(
            "GET",
            "/api/requests?status=pending",
            None,
            Some(&manager.token),
        )
        .await;
    assert_eq!(pending.body["data"]["total_items"], 2);

    let forbidden = app
        .request(
            "GET",
            &format!("/api/requests/{alice_request}"),
            None,
            Some(&bob.token),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let allowed = app
        .request(
            "GET",
            &format!("/api/requests/{alice_request}"),
            None,
            Some(&manager.token),
        )
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
}
