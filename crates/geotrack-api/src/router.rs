//! Route definitions for the GeoTrack HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.
//! The router receives `AppState` and passes it to all handlers via Axum's `State` extractor.

use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(request_routes())
        .merge(device_routes())
        .merge(credential_routes())
        .merge(location_routes())
        .merge(history_routes());

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Liveness and store health
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Multi-device requests and per-item decisions
fn request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/requests",
            get(handlers::request::list_requests).post(handlers::request::submit_request),
        )
        .route("/requests/{id}", get(handlers::request::get_request))
        .route(
            "/requests/{id}/items/{index}/approve",
            post(handlers::request::approve_item),
        )
        .route(
            "/requests/{id}/items/{index}/reject",
            post(handlers::request::reject_item),
        )
}

/// Device directory
fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(handlers::device::list_devices))
        .route(
            "/devices/{device_id}",
            get(handlers::device::get_device).delete(handlers::device::delete_device),
        )
        .route(
            "/devices/{device_id}/status",
            put(handlers::device::update_status),
        )
        .route(
            "/devices/{device_id}/tracking/start",
            post(handlers::device::start_tracking),
        )
        .route(
            "/devices/{device_id}/tracking/stop",
            post(handlers::device::stop_tracking),
        )
        .route(
            "/devices/{device_id}/telemetry",
            post(handlers::device::report_telemetry),
        )
        .route(
            "/devices/{device_id}/location",
            get(handlers::device::current_location),
        )
}

/// QR credentials and scanning
fn credential_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/devices/{device_id}/credential",
            get(handlers::credential::get_credential),
        )
        .route(
            "/devices/{device_id}/credential/validate",
            get(handlers::credential::validate_credential),
        )
        .route(
            "/devices/{device_id}/credential/regenerate",
            post(handlers::credential::regenerate_credential),
        )
        .route(
            "/devices/{device_id}/credential/deactivate",
            post(handlers::credential::deactivate_credential),
        )
        .route("/scan", post(handlers::credential::scan))
}

/// Ingestion, raw records and alerts
fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", post(handlers::location::ingest))
        .route(
            "/devices/{device_id}/records",
            get(handlers::location::recent_records),
        )
        .route(
            "/records/{record_id}/alerts/{index}/acknowledge",
            post(handlers::location::acknowledge_alert),
        )
}

/// Path history
fn history_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/devices/{device_id}/history",
            get(handlers::history::get_history),
        )
        .route(
            "/devices/{device_id}/history/dates",
            get(handlers::history::available_dates),
        )
        .route(
            "/devices/{device_id}/history/{date}",
            get(handlers::history::history_for_date),
        )
}
