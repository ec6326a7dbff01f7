//! QR credential handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use geotrack_entity::device::QrPayload;
use geotrack_service::credential::{CredentialView, ScanSnapshot};

use crate::dto::request::{ScanRequest, ValidityParams};
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::path::parse_device_code;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// GET /api/devices/{device_id}/credential
pub async fn get_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<CredentialView> {
    let code = parse_device_code(&device_id)?;
    let view = state.credential_service.get_credential(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/devices/{device_id}/credential/validate
///
/// The body is the decoded QR payload, which keeps the camelCase keys of
/// the printed document (`deviceId`, `validUntil`) rather than the
/// snake_case used by the rest of the API.
pub async fn validate_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<QrPayload> {
    let code = parse_device_code(&device_id)?;
    let payload = state.credential_service.validate(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(payload)))
}

/// POST /api/devices/{device_id}/credential/regenerate
pub async fn regenerate_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
    Query(params): Query<ValidityParams>,
) -> ApiResult<CredentialView> {
    let code = parse_device_code(&device_id)?;
    let view = state
        .credential_service
        .regenerate(&auth, &code, params.validity_days)
        .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/devices/{device_id}/credential/deactivate
pub async fn deactivate_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<CredentialView> {
    let code = parse_device_code(&device_id)?;
    let view = state.credential_service.deactivate(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/scan
pub async fn scan(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ScanRequest>,
) -> ApiResult<ScanSnapshot> {
    let snapshot = state.credential_service.scan(&auth, &req.payload).await?;
    Ok(Json(ApiResponse::ok(snapshot)))
}
