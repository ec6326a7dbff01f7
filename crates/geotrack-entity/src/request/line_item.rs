//! A single requested device within a multi-device request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::LineItemStatus;
use crate::device::DeviceCode;

/// One requested device and its review outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLineItem {
    /// Requested device name.
    pub name: String,
    /// What the device will be used for.
    pub purpose: String,
    /// Requested hardware model.
    pub model: Option<String>,
    /// Requested category.
    pub category: Option<String>,
    /// Review status.
    pub status: LineItemStatus,
    /// Approver, once approved.
    pub approved_by: Option<Uuid>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Reviewer who rejected the item.
    pub rejected_by: Option<Uuid>,
    /// Rejection time.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Device provisioned on approval.
    pub device_id: Option<DeviceCode>,
    /// When the item was submitted.
    pub created_at: DateTime<Utc>,
}

impl DeviceLineItem {
    /// Create a pending item.
    pub fn pending(new: NewLineItem, now: DateTime<Utc>) -> Self {
        Self {
            name: new.name.trim().to_string(),
            purpose: new.purpose.trim().to_string(),
            model: new.model,
            category: new.category,
            status: LineItemStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            device_id: None,
            created_at: now,
        }
    }
}

/// Submitted data for one line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    /// Device name.
    pub name: String,
    /// Intended use.
    pub purpose: String,
    /// Hardware model.
    pub model: Option<String>,
    /// Category.
    pub category: Option<String>,
}
