//! Denormalized location history series.

use chrono::{DateTime, Utc};
use geotrack_core::types::GeoPoint;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::device::DeviceCode;

/// One point of a device's path, with distances already accumulated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationHistoryEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Reporting device.
    pub device_id: DeviceCode,
    /// Device name at ingestion time.
    pub device_name: String,
    /// Raw record this entry was derived from.
    pub record_id: Uuid,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Speed in m/s.
    pub speed: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Address, if known.
    pub address: Option<String>,
    /// Device clock time of the fix.
    pub recorded_at: DateTime<Utc>,
    /// Meters from the previous point, rounded to centimeters.
    pub distance_from_previous: f64,
    /// Cumulative meters for the device, rounded to centimeters.
    pub total_distance: f64,
    /// `<device id>:<YYYY-MM-DD>` bucket.
    pub route_id: String,
    /// First entry of its bucket.
    pub is_route_start: bool,
    /// Last entry of its bucket, set when the next bucket opens.
    pub is_route_end: bool,
}

impl LocationHistoryEntry {
    /// The recorded point.
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
