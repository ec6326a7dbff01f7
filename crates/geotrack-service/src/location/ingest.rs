//! Validation and persistence of incoming location reports.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use geotrack_core::config::TrackingConfig;
use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_core::types::GeoPoint;
use geotrack_database::{DeviceStore, LocationStore};
use geotrack_entity::device::{Device, DeviceCode};
use geotrack_entity::location::{
    LocationHistoryEntry, LocationRecord, LocationSource, NewLocationAlert, NewLocationRecord,
};

use crate::context::RequestContext;

/// A location report as submitted by a device or its owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationReport {
    /// Reporting device.
    pub device_id: String,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Speed in m/s.
    pub speed: Option<f64>,
    /// Heading in degrees, `[0, 360)`.
    pub heading: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Address, if the device knows it.
    pub address: Option<String>,
    /// Fix source; GPS when absent.
    pub source: Option<LocationSource>,
    /// Device clock time; server time when absent.
    pub recorded_at: Option<DateTime<Utc>>,
    /// Alerts raised by the device.
    #[serde(default)]
    pub alerts: Vec<NewLocationAlert>,
}

impl LocationReport {
    fn point(&self) -> AppResult<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => GeoPoint::new(latitude, longitude),
            (None, _) => Err(AppError::validation("latitude is required")),
            (_, None) => Err(AppError::validation("longitude is required")),
        }
    }

    fn validate_extras(&self) -> AppResult<()> {
        let non_negative = [("accuracy", self.accuracy), ("speed", self.speed)];
        for (field, value) in non_negative {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(AppError::validation(format!(
                    "{field} must be a non-negative number, got {v}"
                )));
            }
        }
        if let Some(h) = self.heading
            && (!h.is_finite() || !(0.0..360.0).contains(&h))
        {
            return Err(AppError::validation(format!(
                "heading must be in [0, 360), got {h}"
            )));
        }
        if let Some(a) = self.altitude
            && !a.is_finite()
        {
            return Err(AppError::validation("altitude must be a finite number"));
        }
        for (index, alert) in self.alerts.iter().enumerate() {
            if alert.alert_type.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Alert {index}: type is required"
                )));
            }
        }
        Ok(())
    }
}

/// Result of ingesting one report.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// The stored history entry.
    pub entry: LocationHistoryEntry,
    /// Meters from the previous point.
    pub distance_from_previous: f64,
    /// Cumulative meters.
    pub total_distance: f64,
    /// Points in the entry's day bucket.
    pub path_point_count: u64,
    /// The report repeated an already stored one.
    pub duplicate: bool,
    /// The report arrived after a later one.
    pub late: bool,
}

/// Location ingestion pipeline.
#[derive(Clone)]
pub struct IngestionService {
    /// Device directory.
    devices: Arc<dyn DeviceStore>,
    /// Record and history persistence.
    locations: Arc<dyn LocationStore>,
    /// Query limits and clock skew bound.
    config: TrackingConfig,
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService").finish_non_exhaustive()
    }
}

impl IngestionService {
    /// Creates a new ingestion service.
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        locations: Arc<dyn LocationStore>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            devices,
            locations,
            config,
        }
    }

    /// Validate and store a report.
    ///
    /// The distance is computed against the chronologically latest stored
    /// entry; the store serializes this per device.
    pub async fn ingest(
        &self,
        ctx: &RequestContext,
        report: LocationReport,
    ) -> AppResult<IngestOutcome> {
        let point = report.point()?;
        report.validate_extras()?;
        let code = DeviceCode::parse(&report.device_id)?;

        let device = self.load(&code).await?;
        ctx.require_device_access(&device)?;

        let now = Utc::now();
        // Timestamps are stored with microsecond precision; dedup compares them exactly.
        let recorded_at = report.recorded_at.unwrap_or(now).trunc_subsecs(6);
        let max_skew = Duration::seconds(self.config.max_clock_skew_seconds);
        if recorded_at > now + max_skew {
            return Err(AppError::validation(format!(
                "recorded_at {recorded_at} is more than {}s ahead of server time",
                self.config.max_clock_skew_seconds
            )));
        }
        let address = report
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let outcome = self
            .locations
            .append(NewLocationRecord {
                device_id: code.clone(),
                point,
                accuracy: report.accuracy,
                speed: report.speed,
                heading: report.heading,
                altitude: report.altitude,
                address,
                source: report.source.unwrap_or_default(),
                alerts: report.alerts,
                recorded_at,
                received_at: now,
            })
            .await?;

        if outcome.duplicate {
            warn!(
                device_id = %code,
                recorded_at = %recorded_at,
                "Duplicate location report, returning stored entry"
            );
        } else if outcome.late {
            warn!(
                device_id = %code,
                recorded_at = %recorded_at,
                "Late location report stored without advancing the path"
            );
        } else {
            debug!(
                device_id = %code,
                distance = outcome.entry.distance_from_previous,
                total = outcome.entry.total_distance,
                route_id = %outcome.entry.route_id,
                "Location ingested"
            );
        }

        Ok(IngestOutcome {
            distance_from_previous: outcome.entry.distance_from_previous,
            total_distance: outcome.entry.total_distance,
            path_point_count: outcome.route_point_count,
            duplicate: outcome.duplicate,
            late: outcome.late,
            entry: outcome.entry,
        })
    }

    /// Raw records, newest first.
    pub async fn recent_records(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        limit: Option<u64>,
    ) -> AppResult<Vec<LocationRecord>> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;

        let limit = match limit {
            Some(0) => return Err(AppError::validation("limit must be at least 1")),
            Some(n) => n.min(self.config.history_max_limit),
            None => self.config.recent_records_limit,
        };
        self.locations.recent_records(code, limit).await
    }

    /// Mark one alert of a record acknowledged.
    pub async fn acknowledge_alert(
        &self,
        ctx: &RequestContext,
        record_id: Uuid,
        index: usize,
    ) -> AppResult<LocationRecord> {
        let record = self
            .locations
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Location record {record_id} not found")))?;
        let device = self.load(&record.device_id).await?;
        ctx.require_device_access(&device)?;

        let record = self
            .locations
            .acknowledge_alert(record_id, index, ctx.user_id, Utc::now())
            .await?;
        debug!(user_id = %ctx.user_id, record_id = %record_id, index, "Alert acknowledged");
        Ok(record)
    }

    async fn load(&self, code: &DeviceCode) -> AppResult<Device> {
        self.devices
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))
    }
}
