//! Append-only raw location records.

use chrono::{DateTime, Utc};
use geotrack_core::types::GeoPoint;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::alert::{LocationAlert, NewLocationAlert};
use crate::device::DeviceCode;

/// Where a fix came from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "location_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Satellite fix.
    #[default]
    Gps,
    /// Cell network triangulation.
    Network,
    /// Wi-Fi positioning.
    Wifi,
    /// Entered by hand.
    Manual,
}

/// A raw report as received.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Reporting device.
    pub device_id: DeviceCode,
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
    /// Reverse-geocoded or device-supplied address.
    pub address: Option<String>,
    /// Fix source.
    pub source: LocationSource,
    /// Alerts attached to the report.
    pub alerts: Json<Vec<LocationAlert>>,
    /// Device clock time of the fix.
    pub recorded_at: DateTime<Utc>,
    /// Server receive time.
    pub received_at: DateTime<Utc>,
}

impl LocationRecord {
    /// The reported point.
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A validated report ready to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocationRecord {
    /// Reporting device.
    pub device_id: DeviceCode,
    /// Validated point.
    pub point: GeoPoint,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Speed in m/s.
    pub speed: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Address, if supplied.
    pub address: Option<String>,
    /// Fix source.
    pub source: LocationSource,
    /// Alerts to attach, stored unacknowledged.
    pub alerts: Vec<NewLocationAlert>,
    /// Device clock time of the fix.
    pub recorded_at: DateTime<Utc>,
    /// Server receive time.
    pub received_at: DateTime<Utc>,
}

impl NewLocationRecord {
    /// Assign an id and materialize the stored record.
    pub fn into_record(self) -> LocationRecord {
        LocationRecord {
            id: Uuid::new_v4(),
            device_id: self.device_id,
            latitude: self.point.latitude,
            longitude: self.point.longitude,
            accuracy: self.accuracy,
            speed: self.speed,
            heading: self.heading,
            altitude: self.altitude,
            address: self.address,
            source: self.source,
            alerts: Json(self.alerts.into_iter().map(LocationAlert::from).collect()),
            recorded_at: self.recorded_at,
            received_at: self.received_at,
        }
    }
}
