//! Request, line-item and priority enumerations.

use std::fmt;
use std::str::FromStr;

use geotrack_core::AppError;
use serde::{Deserialize, Serialize};

/// Status of a single line item. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemStatus {
    /// Awaiting review.
    Pending,
    /// Approved; a device was provisioned.
    Approved,
    /// Rejected with a reason.
    Rejected,
}

impl LineItemStatus {
    /// Check if the item has been decided.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate status of a request, derived from its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// No decision rolls up yet.
    Pending,
    /// At least one item approved, not all items share one status.
    PartiallyApproved,
    /// Every item approved.
    FullyApproved,
    /// Every item rejected.
    Rejected,
}

impl RequestStatus {
    /// Roll up line-item statuses.
    ///
    /// A uniform set maps directly (`approved` to `fully_approved`,
    /// `rejected` to `rejected`, `pending` to `pending`). A mixed set with
    /// at least one approval is `partially_approved`; anything else is
    /// `pending`.
    pub fn aggregate<I>(items: I) -> Self
    where
        I: IntoIterator<Item = LineItemStatus>,
    {
        let mut approved = 0usize;
        let mut rejected = 0usize;
        let mut pending = 0usize;
        for status in items {
            match status {
                LineItemStatus::Approved => approved += 1,
                LineItemStatus::Rejected => rejected += 1,
                LineItemStatus::Pending => pending += 1,
            }
        }

        match (approved, rejected, pending) {
            (a, 0, 0) if a > 0 => Self::FullyApproved,
            (0, r, 0) if r > 0 => Self::Rejected,
            (a, _, _) if a > 0 => Self::PartiallyApproved,
            _ => Self::Pending,
        }
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyApproved => "partially_approved",
            Self::FullyApproved => "fully_approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "partially_approved" => Ok(Self::PartiallyApproved),
            "fully_approved" => Ok(Self::FullyApproved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::validation(format!(
                "Invalid request status: '{s}'. Expected one of: pending, partially_approved, \
                 fully_approved, rejected"
            ))),
        }
    }
}

/// Review priority of a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "request_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    /// Low priority.
    Low,
    /// Normal priority (default).
    #[default]
    Normal,
    /// High priority.
    High,
    /// Needs attention today.
    Urgent,
}

impl RequestPriority {
    /// Return the priority as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for RequestPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
