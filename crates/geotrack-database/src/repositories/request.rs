//! Device request repository implementation.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_entity::device::{Device, QrCredential};
use geotrack_entity::request::DeviceRequest;

use super::db_error;
use super::device::insert_device;
use crate::store::{LineItemApproval, LineItemRejection, RequestFilter, RequestStore};

/// Repository for device requests and their review workflow.
#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    /// Create a new request repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Load a request and lock its row until the transaction ends.
async fn lock_request(conn: &mut PgConnection, id: Uuid) -> AppResult<DeviceRequest> {
    sqlx::query_as::<_, DeviceRequest>("SELECT * FROM device_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to lock request"))?
        .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))
}

/// Persist the review state of a locked request.
async fn save_review(conn: &mut PgConnection, request: &DeviceRequest) -> AppResult<DeviceRequest> {
    sqlx::query_as::<_, DeviceRequest>(
        "UPDATE device_requests SET status = $2, items = $3, notifications = $4, updated_at = $5 \
         WHERE id = $1 RETURNING *",
    )
    .bind(request.id)
    .bind(request.status)
    .bind(&request.items)
    .bind(&request.notifications)
    .bind(request.updated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("Failed to update request"))
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn create(&self, request: &DeviceRequest) -> AppResult<DeviceRequest> {
        sqlx::query_as::<_, DeviceRequest>(
            "INSERT INTO device_requests (id, requester_id, priority, department, status, items, \
             notifications, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(request.id)
        .bind(request.requester_id)
        .bind(request.priority)
        .bind(&request.department)
        .bind(request.status)
        .bind(&request.items)
        .bind(&request.notifications)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create request"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeviceRequest>> {
        sqlx::query_as::<_, DeviceRequest>("SELECT * FROM device_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find request"))
    }

    async fn list(
        &self,
        filter: &RequestFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<DeviceRequest>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM device_requests \
             WHERE ($1::uuid IS NULL OR requester_id = $1) \
             AND ($2::request_status IS NULL OR status = $2)",
        )
        .bind(filter.requester_id)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count requests"))?;

        let requests = sqlx::query_as::<_, DeviceRequest>(
            "SELECT * FROM device_requests \
             WHERE ($1::uuid IS NULL OR requester_id = $1) \
             AND ($2::request_status IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(filter.requester_id)
        .bind(filter.status)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list requests"))?;

        Ok(PageResponse::new(
            requests,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn approve_line_item(
        &self,
        approval: &LineItemApproval,
    ) -> AppResult<(DeviceRequest, Device)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut request = lock_request(&mut tx, approval.request_id).await?;
        let credential = QrCredential::issue(
            &approval.device_id,
            request.requester_id,
            approval.now,
            approval.validity_days,
        )?;
        let new_device = request.provision(
            approval.index,
            approval.device_id.clone(),
            approval.approver_id,
            credential,
        )?;
        let device = insert_device(&mut tx, &Device::from_new(new_device, approval.now))
            .await?;

        request.approve_item(
            approval.index,
            approval.approver_id,
            &approval.device_id,
            approval.now,
        )?;
        let request = save_review(&mut tx, &request).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit approval"))?;

        debug!(
            request_id = %request.id,
            index = approval.index,
            device_id = %device.device_id,
            "Approval committed"
        );
        Ok((request, device))
    }

    async fn reject_line_item(&self, rejection: &LineItemRejection) -> AppResult<DeviceRequest> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut request = lock_request(&mut tx, rejection.request_id).await?;
        request.reject_item(
            rejection.index,
            rejection.reviewer_id,
            &rejection.reason,
            rejection.now,
        )?;
        let request = save_review(&mut tx, &request).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit rejection"))?;
        Ok(request)
    }
}
