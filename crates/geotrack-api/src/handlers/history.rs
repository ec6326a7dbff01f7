//! Path and history query handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use geotrack_entity::location::DailySummary;
use geotrack_service::location::{DayHistory, HistoryResult};

use crate::dto::request::HistoryParams;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::extractors::path::{parse_date, parse_device_code};
use crate::state::AppState;

/// GET /api/devices/{device_id}/history
pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<HistoryResult> {
    let code = parse_device_code(&device_id)?;
    let result = state
        .history_service
        .get_history(&auth, &code, params.into())
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/devices/{device_id}/history/dates
pub async fn available_dates(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(device_id): Path<String>,
) -> ApiResult<Vec<DailySummary>> {
    let code = parse_device_code(&device_id)?;
    let dates = state.history_service.available_dates(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(dates)))
}

/// GET /api/devices/{device_id}/history/{date}
pub async fn history_for_date(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((device_id, date)): Path<(String, String)>,
) -> ApiResult<DayHistory> {
    let code = parse_device_code(&device_id)?;
    let date = parse_date(&date)?;
    let day = state
        .history_service
        .history_for_date(&auth, &code, date)
        .await?;
    Ok(Json(ApiResponse::ok(day)))
}
