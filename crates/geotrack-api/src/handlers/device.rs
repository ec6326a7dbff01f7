//! Device directory handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use geotrack_core::types::pagination::PageResponse;
use geotrack_service::device::{CurrentLocation, DeviceView};

use crate::dto::request::{TelemetryRequest, UpdateStatusRequest};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiResult;
use crate::extractors::path::parse_device_code;
use crate::extractors::{AuthUser, PaginationParams, ValidatedJson};
use crate::state::AppState;

/// GET /api/devices
pub async fn list_devices(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PageResponse<DeviceView>> {
    let result = state
        .device_service
        .list_devices(&auth, &params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/devices/{device_id}
pub async fn get_device(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<DeviceView> {
    let code = parse_device_code(&device_id)?;
    let device = state.device_service.get_device(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(device)))
}

/// PUT /api/devices/{device_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<DeviceView> {
    let code = parse_device_code(&device_id)?;
    let device = state
        .device_service
        .update_status(&auth, &code, req.status)
        .await?;
    Ok(Json(ApiResponse::ok(device)))
}

/// DELETE /api/devices/{device_id}
pub async fn delete_device(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let code = parse_device_code(&device_id)?;
    state.device_service.delete_device(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: format!("Device {code} deleted"),
    })))
}

/// POST /api/devices/{device_id}/tracking/start
pub async fn start_tracking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<DeviceView> {
    let code = parse_device_code(&device_id)?;
    let device = state.device_service.start_tracking(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(device)))
}

/// POST /api/devices/{device_id}/tracking/stop
pub async fn stop_tracking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<DeviceView> {
    let code = parse_device_code(&device_id)?;
    let device = state.device_service.stop_tracking(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(device)))
}

/// POST /api/devices/{device_id}/telemetry
pub async fn report_telemetry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
    ValidatedJson(req): ValidatedJson<TelemetryRequest>,
) -> ApiResult<DeviceView> {
    let code = parse_device_code(&device_id)?;
    let device = state
        .device_service
        .report_telemetry(&auth, &code, req.into())
        .await?;
    Ok(Json(ApiResponse::ok(device)))
}

/// GET /api/devices/{device_id}/location
pub async fn current_location(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<CurrentLocation> {
    let code = parse_device_code(&device_id)?;
    let location = state.device_service.current_location(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(location)))
}
