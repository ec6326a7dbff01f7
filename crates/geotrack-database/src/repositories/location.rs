//! Location record and history repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_entity::device::DeviceCode;
use geotrack_entity::location::{
    DailySummary, LocationHistoryEntry, LocationRecord, NewLocationRecord, Placement,
    SequencedPoint,
};

use super::db_error;
use crate::store::{AppendOutcome, HistoryWindow, LocationStore};

/// Repository for raw location records and the derived history series.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Create a new location repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_record(conn: &mut PgConnection, id: Uuid) -> AppResult<LocationRecord> {
    sqlx::query_as::<_, LocationRecord>("SELECT * FROM location_records WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to find location record"))?
        .ok_or_else(|| AppError::not_found(format!("Location record {id} not found")))
}

async fn count_route_points(conn: &mut PgConnection, route_id: &str) -> AppResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM location_history WHERE route_id = $1")
        .bind(route_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("Failed to count route points"))?;
    Ok(count as u64)
}

async fn insert_record(conn: &mut PgConnection, record: &LocationRecord) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO location_records (id, device_id, latitude, longitude, accuracy, speed, \
         heading, altitude, address, source, alerts, recorded_at, received_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(record.id)
    .bind(&record.device_id)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.accuracy)
    .bind(record.speed)
    .bind(record.heading)
    .bind(record.altitude)
    .bind(&record.address)
    .bind(record.source)
    .bind(&record.alerts)
    .bind(record.recorded_at)
    .bind(record.received_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error("Failed to insert location record"))?;
    Ok(())
}

async fn insert_entry(conn: &mut PgConnection, entry: &LocationHistoryEntry) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO location_history (id, device_id, device_name, record_id, latitude, longitude, \
         accuracy, speed, heading, altitude, address, recorded_at, distance_from_previous, \
         total_distance, route_id, is_route_start, is_route_end) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(entry.id)
    .bind(&entry.device_id)
    .bind(&entry.device_name)
    .bind(entry.record_id)
    .bind(entry.latitude)
    .bind(entry.longitude)
    .bind(entry.accuracy)
    .bind(entry.speed)
    .bind(entry.heading)
    .bind(entry.altitude)
    .bind(&entry.address)
    .bind(entry.recorded_at)
    .bind(entry.distance_from_previous)
    .bind(entry.total_distance)
    .bind(&entry.route_id)
    .bind(entry.is_route_start)
    .bind(entry.is_route_end)
    .execute(&mut *conn)
    .await
    .map_err(db_error("Failed to insert history entry"))?;
    Ok(())
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn append(&self, report: NewLocationRecord) -> AppResult<AppendOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // The device row lock serializes ingestion per device.
        let device_name: String =
            sqlx::query_scalar("SELECT name FROM devices WHERE device_id = $1 FOR UPDATE")
                .bind(&report.device_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to lock device"))?
                .ok_or_else(|| {
                    AppError::not_found(format!("Device {} not found", report.device_id))
                })?;

        let existing = sqlx::query_as::<_, LocationHistoryEntry>(
            "SELECT * FROM location_history WHERE device_id = $1 AND recorded_at = $2",
        )
        .bind(&report.device_id)
        .bind(report.recorded_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to check for duplicate report"))?;

        if let Some(entry) = existing {
            let record = fetch_record(&mut tx, entry.record_id).await?;
            let route_point_count = count_route_points(&mut tx, &entry.route_id).await?;
            tx.commit()
                .await
                .map_err(db_error("Failed to commit duplicate check"))?;
            return Ok(AppendOutcome {
                entry,
                record,
                duplicate: true,
                late: false,
                route_point_count,
            });
        }

        let latest = sqlx::query_as::<_, LocationHistoryEntry>(
            "SELECT * FROM location_history WHERE device_id = $1 \
             ORDER BY recorded_at DESC LIMIT 1",
        )
        .bind(&report.device_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to load latest history entry"))?;

        let predecessor = match &latest {
            Some(l) if l.recorded_at > report.recorded_at => sqlx::query_as::<
                _,
                LocationHistoryEntry,
            >(
                "SELECT * FROM location_history WHERE device_id = $1 AND recorded_at < $2 \
                 ORDER BY recorded_at DESC LIMIT 1",
            )
            .bind(&report.device_id)
            .bind(report.recorded_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load preceding history entry"))?,
            _ => latest.clone(),
        };

        let successor = match &latest {
            Some(l) if l.recorded_at > report.recorded_at => sqlx::query_as::<
                _,
                LocationHistoryEntry,
            >(
                "SELECT * FROM location_history WHERE device_id = $1 AND recorded_at > $2 \
                 ORDER BY recorded_at ASC LIMIT 1",
            )
            .bind(&report.device_id)
            .bind(report.recorded_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load following history entry"))?,
            _ => None,
        };

        let placed = SequencedPoint::place(
            &report.device_id,
            report.point,
            report.recorded_at,
            latest.as_ref(),
            predecessor.as_ref(),
            successor.as_ref(),
        );
        let closes_previous = placed.closes_previous_route;
        let placement = placed.placement;

        if placed.takes_route_start
            && let Some(next) = &successor
        {
            sqlx::query("UPDATE location_history SET is_route_start = FALSE WHERE id = $1")
                .bind(next.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to move route start"))?;
        }
        if placed.takes_route_end
            && let Some(previous) = &predecessor
        {
            sqlx::query("UPDATE location_history SET is_route_end = FALSE WHERE id = $1")
                .bind(previous.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to move route end"))?;
        }

        let record = report.into_record();
        insert_record(&mut tx, &record).await?;

        if closes_previous {
            if let Some(previous) = &latest {
                sqlx::query("UPDATE location_history SET is_route_end = TRUE WHERE id = $1")
                    .bind(previous.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to close previous route"))?;
            }
        }

        let entry = placed.into_entry(&record, &device_name);
        insert_entry(&mut tx, &entry).await?;

        if placement == Placement::Late {
            sqlx::query(
                "UPDATE devices SET last_seen = GREATEST(last_seen, $2), is_online = TRUE, \
                 updated_at = $2 WHERE device_id = $1",
            )
            .bind(&record.device_id)
            .bind(record.received_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to refresh device"))?;
        } else {
            sqlx::query(
                "UPDATE devices SET last_latitude = $2, last_longitude = $3, last_accuracy = $4, \
                 last_location_at = $5, last_address = $6, last_seen = GREATEST(last_seen, $7), \
                 is_online = TRUE, updated_at = $7 WHERE device_id = $1",
            )
            .bind(&record.device_id)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.accuracy)
            .bind(record.recorded_at)
            .bind(&record.address)
            .bind(record.received_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update device location cache"))?;
        }

        let route_point_count = count_route_points(&mut tx, &entry.route_id).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit location report"))?;

        debug!(
            device_id = %entry.device_id,
            placement = ?placement,
            distance = entry.distance_from_previous,
            total = entry.total_distance,
            "Location report stored"
        );

        Ok(AppendOutcome {
            entry,
            record,
            duplicate: false,
            late: placement == Placement::Late,
            route_point_count,
        })
    }

    async fn history(
        &self,
        code: &DeviceCode,
        window: &HistoryWindow,
    ) -> AppResult<Vec<LocationHistoryEntry>> {
        let end_op = if window.end_inclusive { "<=" } else { "<" };
        let sql = format!(
            "SELECT * FROM ( \
                SELECT * FROM location_history WHERE device_id = $1 \
                AND ($2::timestamptz IS NULL OR recorded_at >= $2) \
                AND ($3::timestamptz IS NULL OR recorded_at {end_op} $3) \
                ORDER BY recorded_at DESC LIMIT $4 \
             ) recent ORDER BY recorded_at ASC"
        );
        sqlx::query_as::<_, LocationHistoryEntry>(&sql)
            .bind(code)
            .bind(window.start)
            .bind(window.end)
            .bind(window.limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to query location history"))
    }

    async fn daily_summaries(&self, code: &DeviceCode) -> AppResult<Vec<DailySummary>> {
        let rows: Vec<(NaiveDate, i64, f64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT (recorded_at AT TIME ZONE 'UTC')::date AS day, COUNT(*), \
             MAX(total_distance), MIN(recorded_at), MAX(recorded_at) \
             FROM location_history WHERE device_id = $1 \
             GROUP BY day ORDER BY day DESC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to summarize location history"))?;

        Ok(rows
            .into_iter()
            .map(
                |(date, point_count, total_distance, start_time, end_time)| DailySummary {
                    date,
                    point_count: point_count as u64,
                    total_distance,
                    start_time,
                    end_time,
                },
            )
            .collect())
    }

    async fn recent_records(
        &self,
        code: &DeviceCode,
        limit: u64,
    ) -> AppResult<Vec<LocationRecord>> {
        sqlx::query_as::<_, LocationRecord>(
            "SELECT * FROM location_records WHERE device_id = $1 \
             ORDER BY recorded_at DESC, received_at DESC LIMIT $2",
        )
        .bind(code)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list location records"))
    }

    async fn find_record(&self, id: Uuid) -> AppResult<Option<LocationRecord>> {
        sqlx::query_as::<_, LocationRecord>("SELECT * FROM location_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find location record"))
    }

    async fn acknowledge_alert(
        &self,
        record_id: Uuid,
        index: usize,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<LocationRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut record = sqlx::query_as::<_, LocationRecord>(
            "SELECT * FROM location_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock location record"))?
        .ok_or_else(|| AppError::not_found(format!("Location record {record_id} not found")))?;

        let alert = record.alerts.get_mut(index).ok_or_else(|| {
            AppError::not_found(format!("Location record {record_id} has no alert {index}"))
        })?;
        alert.acknowledge(user_id, now);

        sqlx::query("UPDATE location_records SET alerts = $2 WHERE id = $1")
            .bind(record_id)
            .bind(&record.alerts)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to acknowledge alert"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit alert acknowledgement"))?;
        Ok(record)
    }
}
