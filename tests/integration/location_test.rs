//! Location ingestion, raw records and history routes.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::helpers::{Actor, TestApp};

async fn report(app: &TestApp, actor: &Actor, body: Value) -> crate::helpers::TestResponse {
    app.request("POST", "/api/locations", Some(body), Some(&actor.token))
        .await
}

#[tokio::test]
async fn test_ingest_accumulates_distance() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    let first = report(
        &app,
        &owner,
        json!({ "device_id": device_id, "latitude": 0.0, "longitude": 0.0,
                "recorded_at": "2024-03-10T12:00:00Z" }),
    )
    .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["distance_from_previous"], 0.0);
    assert_eq!(first.body["data"]["total_distance"], 0.0);
    assert_eq!(first.body["data"]["entry"]["is_route_start"], true);

    let second = report(
        &app,
        &owner,
        json!({ "deviceId": device_id, "lat": 0.0, "lng": 1.0,
                "recorded_at": "2024-03-10T12:10:00Z" }),
    )
    .await;
    assert_eq!(second.status, StatusCode::CREATED);
    let distance = second.body["data"]["distance_from_previous"]
        .as_f64()
        .expect("distance");
    assert!((distance - 111_194.93).abs() < 0.01);
    assert_eq!(second.body["data"]["path_point_count"], 2);

    let location = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/location"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(location.status, StatusCode::OK);
    assert_eq!(location.body["data"]["location"]["longitude"], 1.0);
}

#[tokio::test]
async fn test_duplicate_report_is_idempotent() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;
    let body = json!({ "device_id": device_id, "latitude": 10.0, "longitude": 10.0,
                       "recorded_at": "2024-03-10T08:00:00Z" });

    let first = report(&app, &owner, body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let repeat = report(&app, &owner, body).await;
    assert_eq!(repeat.status, StatusCode::OK);
    assert_eq!(repeat.body["data"]["duplicate"], true);
    assert_eq!(
        repeat.body["data"]["entry"]["id"],
        first.body["data"]["entry"]["id"]
    );

    let history = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(history.body["data"]["route_info"]["total_points"], 1);
}

#[tokio::test]
async fn test_invalid_reports() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let stranger = app.actor("user");
    let device_id = app.provision(&owner).await;

    let out_of_range = report(
        &app,
        &owner,
        json!({ "device_id": device_id, "latitude": 91.0, "longitude": 0.0 }),
    )
    .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let missing = report(
        &app,
        &owner,
        json!({ "device_id": device_id, "latitude": 1.0 }),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let unknown = report(
        &app,
        &owner,
        json!({ "device_id": "DEV-ABCD2345", "latitude": 1.0, "longitude": 1.0 }),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let not_owner = report(
        &app,
        &stranger,
        json!({ "device_id": device_id, "latitude": 1.0, "longitude": 1.0 }),
    )
    .await;
    assert_eq!(not_owner.status, StatusCode::FORBIDDEN);

    let far_future = report(
        &app,
        &owner,
        json!({ "device_id": device_id, "latitude": 1.0, "longitude": 1.0,
                "recorded_at": "2999-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(far_future.status, StatusCode::BAD_REQUEST);
    assert_eq!(far_future.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_alerts_can_be_acknowledged() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    let ingested = report(
        &app,
        &owner,
        json!({
            "device_id": device_id,
            "latitude": 48.85,
            "longitude": 2.35,
            "address": "Paris",
            "alerts": [{ "type": "low_battery", "severity": "warning", "message": "12%" }],
        }),
    )
    .await;
    assert_eq!(ingested.status, StatusCode::CREATED);

    let records = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/records?limit=10"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(records.status, StatusCode::OK);
    let record = &records.body["data"][0];
    assert_eq!(record["alerts"][0]["type"], "low_battery");
    assert_eq!(record["alerts"][0]["acknowledged"], false);
    let record_id = record["id"].as_str().expect("record id");

    let acked = app
        .request(
            "POST",
            &format!("/api/records/{record_id}/alerts/0/acknowledge"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(acked.status, StatusCode::OK);
    assert_eq!(acked.body["data"]["alerts"][0]["acknowledged"], true);
    assert_eq!(
        acked.body["data"]["alerts"][0]["acknowledged_by"],
        owner.id.to_string()
    );

    let missing = app
        .request(
            "POST",
            &format!("/api/records/{record_id}/alerts/3/acknowledge"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_queries() {
    let app = TestApp::new();
    let owner = app.actor("user");
    let device_id = app.provision(&owner).await;

    for (lon, at) in [
        (0.0, "2024-03-10T22:00:00Z"),
        (0.1, "2024-03-10T23:00:00Z"),
        (0.2, "2024-03-11T01:00:00Z"),
    ] {
        let response = report(
            &app,
            &owner,
            json!({ "device_id": device_id, "latitude": 0.0, "longitude": lon, "recorded_at": at }),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let all = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(all.status, StatusCode::OK);
    let entries = all.body["data"]["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["recorded_at"], "2024-03-10T22:00:00Z");
    assert_eq!(entries[2]["is_route_start"], true);
    assert_eq!(all.body["data"]["route_info"]["duration_seconds"], 10_800);

    let limited = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history?limit=2"),
            None,
            Some(&owner.token),
        )
        .await;
    let entries = limited.body["data"]["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["recorded_at"], "2024-03-11T01:00:00Z");

    let ranged = app
        .request(
            "GET",
            &format!(
                "/api/devices/{device_id}/history?start_date=2024-03-10T22:30:00Z&end_date=2024-03-10T23:00:00Z"
            ),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(ranged.body["data"]["route_info"]["total_points"], 1);

    let inverted = app
        .request(
            "GET",
            &format!(
                "/api/devices/{device_id}/history?start_date=2024-03-11T00:00:00Z&end_date=2024-03-10T00:00:00Z"
            ),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);

    let dates = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history/dates"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(dates.status, StatusCode::OK);
    assert_eq!(dates.body["data"][0]["date"], "2024-03-11");
    assert_eq!(dates.body["data"][1]["date"], "2024-03-10");
    assert_eq!(dates.body["data"][1]["point_count"], 2);

    let day = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history/2024-03-10"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(day.status, StatusCode::OK);
    assert_eq!(day.body["data"]["route_stats"]["total_points"], 2);

    let bad_date = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history/yesterday"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);

    let last_day = app
        .request(
            "GET",
            &format!("/api/devices/{device_id}/history/+262142-12-31"),
            None,
            Some(&owner.token),
        )
        .await;
    assert_eq!(last_day.status, StatusCode::BAD_REQUEST);
}
