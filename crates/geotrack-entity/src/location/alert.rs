//! Alert sub-records carried by location reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a location alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Needs immediate attention.
    Critical,
}

/// An alert attached to a stored location record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAlert {
    /// Alert type as reported by the device (e.g. `"low_battery"`).
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Human-readable text.
    pub message: String,
    /// Whether someone acknowledged it.
    pub acknowledged: bool,
    /// Who acknowledged it.
    pub acknowledged_by: Option<Uuid>,
    /// When it was acknowledged.
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Alert data submitted with a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocationAlert {
    /// Alert type.
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Human-readable text.
    pub message: String,
}

impl From<NewLocationAlert> for LocationAlert {
    fn from(new: NewLocationAlert) -> Self {
        Self {
            alert_type: new.alert_type,
            severity: new.severity,
            message: new.message,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }
}

impl LocationAlert {
    /// Mark acknowledged. Acknowledging twice keeps the first acknowledgement.
    pub fn acknowledge(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        if self.acknowledged {
            return;
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(user_id);
        self.acknowledged_at = Some(now);
    }
}
