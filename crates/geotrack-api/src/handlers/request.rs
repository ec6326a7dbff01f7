//! Device request handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_entity::request::DeviceRequest;
use geotrack_service::request::ApprovalOutcome;

use crate::dto::request::{
    RejectItemRequest, RequestListParams, SubmitDeviceRequest, ValidityParams,
};
use crate::dto::response::ApiResponse;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/requests
pub async fn submit_request(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<SubmitDeviceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceRequest>>), ApiError> {
    let request = state
        .request_service
        .submit_request(&auth, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(request))))
}

/// GET /api/requests
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<RequestListParams>,
) -> ApiResult<PageResponse<DeviceRequest>> {
    let page = PageRequest::new(params.page.unwrap_or(1), params.per_page.unwrap_or(25));
    let result = state
        .request_service
        .list_requests(&auth, params.status, &page)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<DeviceRequest> {
    let request = state.request_service.get_request(&auth, id).await?;
    Ok(Json(ApiResponse::ok(request)))
}

/// POST /api/requests/{id}/items/{index}/approve
pub async fn approve_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(params): Query<ValidityParams>,
) -> ApiResult<ApprovalOutcome> {
    let outcome = state
        .request_service
        .approve_line_item(&auth, id, index, params.validity_days)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/requests/{id}/items/{index}/reject
pub async fn reject_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
    ValidatedJson(req): ValidatedJson<RejectItemRequest>,
) -> ApiResult<DeviceRequest> {
    let request = state
        .request_service
        .reject_line_item(&auth, id, index, &req.reason)
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}
