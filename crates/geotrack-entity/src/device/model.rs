//! Device entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::code::DeviceCode;
use super::credential::QrCredential;
use super::status::{DeviceStatus, TrackingState};

/// A provisioned device.
///
/// The credential, the cached last location and the telemetry are stored
/// flat on the row and exposed through accessor methods.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    /// Internal row identifier.
    pub id: Uuid,
    /// Human-readable device id.
    pub device_id: DeviceCode,
    /// Display name.
    pub name: String,
    /// Free-form category (e.g. `"vehicle"`).
    pub category: Option<String>,
    /// Hardware model.
    pub model: Option<String>,
    /// Purpose copied from the line item.
    pub purpose: String,
    /// Administrative status.
    pub status: DeviceStatus,
    /// Owning user (the original requester).
    pub owner_id: Uuid,
    /// Who requested the device.
    pub requested_by: Uuid,
    /// Who approved the line item.
    pub approved_by: Uuid,
    /// When the line item was approved.
    pub approved_at: DateTime<Utc>,
    /// Source request.
    pub request_id: Uuid,
    /// Index of the source line item.
    pub line_item_index: i32,
    /// Encoded QR payload.
    pub qr_payload: String,
    /// Credential issue time.
    pub qr_issued_at: DateTime<Utc>,
    /// Credential expiry.
    pub qr_valid_until: DateTime<Utc>,
    /// Credential active flag.
    pub qr_active: bool,
    /// Cached latitude of the latest accepted report.
    pub last_latitude: Option<f64>,
    /// Cached longitude of the latest accepted report.
    pub last_longitude: Option<f64>,
    /// Cached accuracy in meters.
    pub last_accuracy: Option<f64>,
    /// Time of the latest accepted report.
    pub last_location_at: Option<DateTime<Utc>>,
    /// Cached address, if the report carried one.
    pub last_address: Option<String>,
    /// Whether the device is expected to report.
    pub tracking_enabled: bool,
    /// When tracking was last switched on.
    pub tracking_started_at: Option<DateTime<Utc>>,
    /// When tracking was last switched off.
    pub tracking_stopped_at: Option<DateTime<Utc>>,
    /// Battery level in percent.
    pub battery_level: Option<i32>,
    /// Signal strength in percent.
    pub signal_strength: Option<i32>,
    /// Online flag as of the last report or heartbeat.
    pub is_online: bool,
    /// Last report or heartbeat.
    pub last_seen: Option<DateTime<Utc>>,
    /// When the device was created.
    pub created_at: DateTime<Utc>,
    /// When the device was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Cached snapshot of the most recently accepted location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastKnownLocation {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Report time.
    pub recorded_at: DateTime<Utc>,
    /// Address, if known.
    pub address: Option<String>,
}

impl Device {
    /// Build a device row from creation data.
    pub fn from_new(new: NewDevice, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: new.device_id,
            name: new.name,
            category: new.category,
            model: new.model,
            purpose: new.purpose,
            status: DeviceStatus::Approved,
            owner_id: new.owner_id,
            requested_by: new.owner_id,
            approved_by: new.approved_by,
            approved_at: now,
            request_id: new.request_id,
            line_item_index: new.line_item_index,
            qr_payload: new.credential.payload,
            qr_issued_at: new.credential.issued_at,
            qr_valid_until: new.credential.valid_until,
            qr_active: new.credential.is_active,
            last_latitude: None,
            last_longitude: None,
            last_accuracy: None,
            last_location_at: None,
            last_address: None,
            tracking_enabled: false,
            tracking_started_at: None,
            tracking_stopped_at: None,
            battery_level: None,
            signal_strength: None,
            is_online: false,
            last_seen: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The stored QR credential.
    pub fn credential(&self) -> QrCredential {
        QrCredential {
            payload: self.qr_payload.clone(),
            issued_at: self.qr_issued_at,
            valid_until: self.qr_valid_until,
            is_active: self.qr_active,
        }
    }

    /// Replace the stored credential.
    pub fn set_credential(&mut self, credential: QrCredential) {
        self.qr_payload = credential.payload;
        self.qr_issued_at = credential.issued_at;
        self.qr_valid_until = credential.valid_until;
        self.qr_active = credential.is_active;
    }

    /// The cached last-known location, if the device ever reported.
    pub fn last_known_location(&self) -> Option<LastKnownLocation> {
        match (self.last_latitude, self.last_longitude, self.last_location_at) {
            (Some(latitude), Some(longitude), Some(recorded_at)) => Some(LastKnownLocation {
                latitude,
                longitude,
                accuracy: self.last_accuracy,
                recorded_at,
                address: self.last_address.clone(),
            }),
            _ => None,
        }
    }

    /// Derived tracking sub-state at `now`.
    pub fn tracking_state(&self, now: DateTime<Utc>, threshold: Duration) -> TrackingState {
        TrackingState::derive(self.tracking_enabled, self.last_seen, now, threshold)
    }

    /// Check whether `user_id` owns this device.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Data required to provision a device for an approved line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDevice {
    /// Freshly allocated device id.
    pub device_id: DeviceCode,
    /// Display name from the line item.
    pub name: String,
    /// Category from the line item.
    pub category: Option<String>,
    /// Model from the line item.
    pub model: Option<String>,
    /// Purpose from the line item.
    pub purpose: String,
    /// The requester, who becomes the owner.
    pub owner_id: Uuid,
    /// The approver.
    pub approved_by: Uuid,
    /// Source request.
    pub request_id: Uuid,
    /// Source line item index.
    pub line_item_index: i32,
    /// Credential issued at approval.
    pub credential: QrCredential,
}
