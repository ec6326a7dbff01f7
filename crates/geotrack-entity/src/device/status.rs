//! Device lifecycle status and derived tracking state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use geotrack_core::AppError;
use serde::{Deserialize, Serialize};

/// Administrative lifecycle status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "device_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Freshly provisioned from an approved line item.
    Approved,
    /// In service.
    Active,
    /// Taken out of service.
    Inactive,
    /// Temporarily out of service for repair.
    Maintenance,
}

impl DeviceStatus {
    /// Statuses reachable from this one by an administrative change.
    pub fn allowed_transitions(&self) -> &'static [DeviceStatus] {
        match self {
            Self::Approved => &[Self::Active, Self::Inactive, Self::Maintenance],
            Self::Active => &[Self::Inactive, Self::Maintenance],
            Self::Inactive => &[Self::Active, Self::Maintenance],
            Self::Maintenance => &[Self::Active, Self::Inactive],
        }
    }

    /// Check whether moving to `next` is permitted.
    pub fn can_transition_to(&self, next: DeviceStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(AppError::validation(format!(
                "Invalid device status: '{s}'. Expected one of: approved, active, inactive, maintenance"
            ))),
        }
    }
}

/// Tracking sub-state derived from the tracking flag and `last_seen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// Tracking is switched off.
    Disabled,
    /// Tracking is on and the device reported recently.
    Online,
    /// Tracking is on but the device has gone quiet.
    Offline,
}

impl TrackingState {
    /// Derive the state at `now` given a staleness threshold.
    pub fn derive(
        tracking_enabled: bool,
        last_seen: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Self {
        if !tracking_enabled {
            return Self::Disabled;
        }
        match last_seen {
            Some(seen) if now - seen <= threshold => Self::Online,
            _ => Self::Offline,
        }
    }
}
