//! Device-request domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events raised while a device request moves through review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RequestEvent {
    /// A requester submitted a new request.
    Submitted {
        /// The request ID.
        request_id: Uuid,
        /// Who submitted it.
        requester_id: Uuid,
        /// Number of line items.
        item_count: usize,
    },
    /// A line item was approved and a device was provisioned for it.
    LineItemApproved {
        /// The request ID.
        request_id: Uuid,
        /// Index of the approved line item.
        item_index: usize,
        /// Human-readable id of the new device.
        device_id: String,
        /// Owner of the new device.
        owner_id: Uuid,
    },
    /// A line item was rejected.
    LineItemRejected {
        /// The request ID.
        request_id: Uuid,
        /// Index of the rejected line item.
        item_index: usize,
        /// The requester to notify.
        requester_id: Uuid,
        /// Reason given by the reviewer.
        reason: String,
    },
}

impl RequestEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "request.submitted",
            Self::LineItemApproved { .. } => "request.line_item_approved",
            Self::LineItemRejected { .. } => "request.line_item_rejected",
        }
    }
}
