//! Device repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_entity::device::{Device, DeviceCode, DeviceStatus, QrCredential};

use super::{db_error, is_unique_violation};
use crate::store::DeviceStore;

/// Repository for the device directory.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Create a new device repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguish "no such device" from "precondition no longer holds"
    /// after a conditional update matched no row.
    async fn missing_or_conflict(&self, code: &DeviceCode, conflict: String) -> AppError {
        match self.code_exists(code).await {
            Ok(true) => AppError::conflict(conflict),
            Ok(false) => AppError::not_found(format!("Device {code} not found")),
            Err(e) => e,
        }
    }
}

/// Insert a device row inside an open transaction.
pub(crate) async fn insert_device(conn: &mut PgConnection, device: &Device) -> AppResult<Device> {
    sqlx::query_as::<_, Device>(
        "INSERT INTO devices (id, device_id, name, category, model, purpose, status, owner_id, \
         requested_by, approved_by, approved_at, request_id, line_item_index, qr_payload, \
         qr_issued_at, qr_valid_until, qr_active, tracking_enabled, is_online, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
         $18, $19, $20, $21) RETURNING *",
    )
    .bind(device.id)
    .bind(&device.device_id)
    .bind(&device.name)
    .bind(&device.category)
    .bind(&device.model)
    .bind(&device.purpose)
    .bind(device.status)
    .bind(device.owner_id)
    .bind(device.requested_by)
    .bind(device.approved_by)
    .bind(device.approved_at)
    .bind(device.request_id)
    .bind(device.line_item_index)
    .bind(&device.qr_payload)
    .bind(device.qr_issued_at)
    .bind(device.qr_valid_until)
    .bind(device.qr_active)
    .bind(device.tracking_enabled)
    .bind(device.is_online)
    .bind(device.created_at)
    .bind(device.updated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::conflict(format!("Device id {} is already taken", device.device_id))
        } else {
            db_error("Failed to create device")(e)
        }
    })
}

#[async_trait]
impl DeviceStore for DeviceRepository {
    async fn find_by_code(&self, code: &DeviceCode) -> AppResult<Option<Device>> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE device_id = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find device"))
    }

    async fn code_exists(&self, code: &DeviceCode) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM devices WHERE device_id = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check device id"))
    }

    async fn list(
        &self,
        owner_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Device>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM devices WHERE ($1::uuid IS NULL OR owner_id = $1)",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count devices"))?;

        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE ($1::uuid IS NULL OR owner_id = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list devices"))?;

        Ok(PageResponse::new(
            devices,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn update_status(
        &self,
        code: &DeviceCode,
        from: DeviceStatus,
        to: DeviceStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        let updated = sqlx::query_as::<_, Device>(
            "UPDATE devices SET status = $3, updated_at = $4 \
             WHERE device_id = $1 AND status = $2 RETURNING *",
        )
        .bind(code)
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update device status"))?;

        match updated {
            Some(device) => Ok(device),
            None => Err(self
                .missing_or_conflict(code, format!("Device {code} is no longer {from}"))
                .await),
        }
    }

    async fn set_tracking(
        &self,
        code: &DeviceCode,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        let updated = sqlx::query_as::<_, Device>(
            "UPDATE devices SET tracking_enabled = $2, \
             tracking_started_at = CASE WHEN $2 THEN $3 ELSE tracking_started_at END, \
             tracking_stopped_at = CASE WHEN $2 THEN tracking_stopped_at ELSE $3 END, \
             is_online = CASE WHEN $2 THEN is_online ELSE FALSE END, \
             updated_at = $3 \
             WHERE device_id = $1 AND tracking_enabled <> $2 RETURNING *",
        )
        .bind(code)
        .bind(enabled)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update tracking"))?;

        match updated {
            Some(device) => Ok(device),
            None => {
                let state = if enabled { "started" } else { "stopped" };
                Err(self
                    .missing_or_conflict(code, format!("Tracking is already {state} for {code}"))
                    .await)
            }
        }
    }

    async fn record_telemetry(
        &self,
        code: &DeviceCode,
        battery_level: Option<i32>,
        signal_strength: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        sqlx::query_as::<_, Device>(
            "UPDATE devices SET battery_level = COALESCE($2, battery_level), \
             signal_strength = COALESCE($3, signal_strength), \
             last_seen = $4, is_online = TRUE, updated_at = $4 \
             WHERE device_id = $1 RETURNING *",
        )
        .bind(code)
        .bind(battery_level)
        .bind(signal_strength)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to record telemetry"))?
        .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))
    }

    async fn replace_credential(
        &self,
        code: &DeviceCode,
        credential: &QrCredential,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        sqlx::query_as::<_, Device>(
            "UPDATE devices SET qr_payload = $2, qr_issued_at = $3, qr_valid_until = $4, \
             qr_active = $5, updated_at = $6 WHERE device_id = $1 RETURNING *",
        )
        .bind(code)
        .bind(&credential.payload)
        .bind(credential.issued_at)
        .bind(credential.valid_until)
        .bind(credential.is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to replace credential"))?
        .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))
    }

    async fn deactivate_credential(
        &self,
        code: &DeviceCode,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        sqlx::query_as::<_, Device>(
            "UPDATE devices SET qr_active = FALSE, updated_at = $2 WHERE device_id = $1 RETURNING *",
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate credential"))?
        .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))
    }

    async fn delete(&self, code: &DeviceCode) -> AppResult<()> {
        // location_records and location_history cascade.
        let result = sqlx::query("DELETE FROM devices WHERE device_id = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete device"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Device {code} not found")));
        }
        debug!(device_id = %code, "Device row deleted");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_error("Health check failed"))
    }
}
