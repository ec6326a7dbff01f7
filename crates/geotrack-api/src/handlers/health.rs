//! Health check handler.

use axum::Json;
use axum::extract::State;

use geotrack_core::error::AppError;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let healthy = state.device_store.health_check().await.map_err(|e| {
        AppError::service_unavailable(format!("Store health check failed: {}", e.message))
    })?;
    if !healthy {
        return Err(AppError::service_unavailable("Store is unavailable").into());
    }

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.config.database.provider.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })))
}
