//! Device lifecycle domain events.

use serde::{Deserialize, Serialize};

/// Events raised by operations on provisioned devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceEvent {
    /// The lifecycle status changed.
    StatusChanged {
        /// Device id.
        device_id: String,
        /// Previous status.
        old_status: String,
        /// New status.
        new_status: String,
    },
    /// Location tracking was switched on.
    TrackingStarted {
        /// Device id.
        device_id: String,
    },
    /// Location tracking was switched off.
    TrackingStopped {
        /// Device id.
        device_id: String,
    },
    /// A fresh QR credential replaced the previous one.
    CredentialRegenerated {
        /// Device id.
        device_id: String,
    },
    /// The QR credential was deactivated.
    CredentialDeactivated {
        /// Device id.
        device_id: String,
    },
    /// The device and its location data were removed.
    Deleted {
        /// Device id.
        device_id: String,
    },
}

impl DeviceEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "device.status_changed",
            Self::TrackingStarted { .. } => "device.tracking_started",
            Self::TrackingStopped { .. } => "device.tracking_stopped",
            Self::CredentialRegenerated { .. } => "device.credential_regenerated",
            Self::CredentialDeactivated { .. } => "device.credential_deactivated",
            Self::Deleted { .. } => "device.deleted",
        }
    }
}
