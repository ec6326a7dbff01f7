//! Location ingestion and raw record handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use geotrack_entity::location::LocationRecord;
use geotrack_service::location::IngestOutcome;

use crate::dto::request::{IngestLocationRequest, LimitParams};
use crate::dto::response::ApiResponse;
use crate::error::{ApiError, ApiResult};
use crate::extractors::path::parse_device_code;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/locations
///
/// Answers `201 Created` for a new point and `200 OK` when the report
/// repeats one that is already stored.
pub async fn ingest(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<IngestLocationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngestOutcome>>), ApiError> {
    let outcome = state.ingestion_service.ingest(&auth, req.into()).await?;
    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::ok(outcome))))
}

/// GET /api/devices/{device_id}/records
pub async fn recent_records(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<LocationRecord>> {
    let code = parse_device_code(&device_id)?;
    let records = state
        .ingestion_service
        .recent_records(&auth, &code, params.limit)
        .await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// POST /api/records/{record_id}/alerts/{index}/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((record_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<LocationRecord> {
    let record = state
        .ingestion_service
        .acknowledge_alert(&auth, record_id, index)
        .await?;
    Ok(Json(ApiResponse::ok(record)))
}
