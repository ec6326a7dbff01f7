//! Device request entity model and its review operations.

use chrono::{DateTime, Utc};
use geotrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::line_item::{DeviceLineItem, NewLineItem};
use super::status::{LineItemStatus, RequestPriority, RequestStatus};
use crate::device::{DeviceCode, NewDevice, QrCredential};

/// A multi-device request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// Who submitted the request.
    pub requester_id: Uuid,
    /// Review priority.
    pub priority: RequestPriority,
    /// Requesting department.
    pub department: Option<String>,
    /// Aggregate status derived from the items.
    pub status: RequestStatus,
    /// Line items, in submission order.
    pub items: Json<Vec<DeviceLineItem>>,
    /// Notifications generated by this request.
    pub notifications: Json<Vec<NotificationLogEntry>>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the request was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Kind of notification recorded on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The request was received.
    RequestSubmitted,
    /// A line item was approved and its device is ready.
    DeviceReady,
    /// A line item was rejected.
    RequestDecided,
}

/// One entry in a request's notification log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    /// What happened.
    pub kind: NotificationKind,
    /// Who should hear about it.
    pub recipient: Uuid,
    /// Human-readable text.
    pub message: String,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

/// Data required to submit a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeviceRequest {
    /// The submitting user.
    pub requester_id: Uuid,
    /// Review priority.
    pub priority: RequestPriority,
    /// Requesting department.
    pub department: Option<String>,
    /// Requested devices.
    pub items: Vec<NewLineItem>,
}

impl DeviceRequest {
    /// Validate submission data and build a request with every item pending.
    pub fn submit(new: NewDeviceRequest, now: DateTime<Utc>) -> AppResult<Self> {
        if new.items.is_empty() {
            return Err(AppError::validation(
                "A request must contain at least one item",
            ));
        }
        for (index, item) in new.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Item {index}: name is required"
                )));
            }
            if item.purpose.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Item {index}: purpose is required"
                )));
            }
        }

        let count = new.items.len();
        let items: Vec<DeviceLineItem> = new
            .items
            .into_iter()
            .map(|item| DeviceLineItem::pending(item, now))
            .collect();
        let notifications = vec![NotificationLogEntry {
            kind: NotificationKind::RequestSubmitted,
            recipient: new.requester_id,
            message: format!("Your request for {count} device(s) was received"),
            at: now,
        }];

        Ok(Self {
            id: Uuid::new_v4(),
            requester_id: new.requester_id,
            priority: new.priority,
            department: new.department,
            status: RequestStatus::Pending,
            items: Json(items),
            notifications: Json(notifications),
            created_at: now,
            updated_at: now,
        })
    }

    /// Borrow an item that is still awaiting review.
    pub fn pending_item(&self, index: usize) -> AppResult<&DeviceLineItem> {
        let item = self.items.get(index).ok_or_else(|| {
            AppError::not_found(format!("Request {} has no item {index}", self.id))
        })?;
        if item.status.is_terminal() {
            return Err(AppError::already_processed(format!(
                "Item {index} of request {} is already {}",
                self.id, item.status
            )));
        }
        Ok(item)
    }

    /// Build the device to provision for a pending item.
    pub fn provision(
        &self,
        index: usize,
        device_id: DeviceCode,
        approver_id: Uuid,
        credential: QrCredential,
    ) -> AppResult<NewDevice> {
        let item = self.pending_item(index)?;
        let line_item_index = i32::try_from(index)
            .map_err(|_| AppError::validation(format!("Item index {index} is out of range")))?;
        Ok(NewDevice {
            device_id,
            name: item.name.clone(),
            category: item.category.clone(),
            model: item.model.clone(),
            purpose: item.purpose.clone(),
            owner_id: self.requester_id,
            approved_by: approver_id,
            request_id: self.id,
            line_item_index,
            credential,
        })
    }

    /// Mark a pending item approved and record the device it produced.
    pub fn approve_item(
        &mut self,
        index: usize,
        approver_id: Uuid,
        device_id: &DeviceCode,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.pending_item(index)?;
        let requester = self.requester_id;
        let item = &mut self.items[index];
        item.status = LineItemStatus::Approved;
        item.approved_by = Some(approver_id);
        item.approved_at = Some(now);
        item.device_id = Some(device_id.clone());
        let message = format!("Device '{}' is ready as {device_id}", item.name);

        self.notifications.push(NotificationLogEntry {
            kind: NotificationKind::DeviceReady,
            recipient: requester,
            message,
            at: now,
        });
        self.refresh_status(now);
        Ok(())
    }

    /// Mark a pending item rejected.
    pub fn reject_item(
        &mut self,
        index: usize,
        reviewer_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }
        self.pending_item(index)?;
        let requester = self.requester_id;
        let item = &mut self.items[index];
        item.status = LineItemStatus::Rejected;
        item.rejected_by = Some(reviewer_id);
        item.rejected_at = Some(now);
        item.rejection_reason = Some(reason.to_string());
        let message = format!("Device '{}' was rejected: {reason}", item.name);

        self.notifications.push(NotificationLogEntry {
            kind: NotificationKind::RequestDecided,
            recipient: requester,
            message,
            at: now,
        });
        self.refresh_status(now);
        Ok(())
    }

    fn refresh_status(&mut self, now: DateTime<Utc>) {
        self.status = RequestStatus::aggregate(self.items.iter().map(|item| item.status));
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrack_core::error::ErrorKind;

    fn item(name: &str) -> NewLineItem {
        NewLineItem {
            name: name.to_string(),
            purpose: "Fleet tracking".to_string(),
            model: Some("GT-100".to_string()),
            category: None,
        }
    }

    fn request(count: usize) -> DeviceRequest {
        DeviceRequest::submit(
            NewDeviceRequest {
                requester_id: Uuid::new_v4(),
                priority: RequestPriority::default(),
                department: Some("Logistics".to_string()),
                items: (0..count).map(|i| item(&format!("Tracker {i}"))).collect(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_submit_validates_items() {
        let mut bad = item("x");
        bad.purpose = "   ".to_string();
        let err = DeviceRequest::submit(
            NewDeviceRequest {
                requester_id: Uuid::new_v4(),
                priority: RequestPriority::Normal,
                department: None,
                items: vec![item("ok"), bad],
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert!(err.message.contains("Item 1"));
    }

    #[test]
    fn test_submit_creates_pending_items() {
        let request = request(2);
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.items.iter().all(|i| i.status == LineItemStatus::Pending));
        assert_eq!(request.notifications.len(), 1);
    }

    #[test]
    fn test_approve_then_reapprove_fails() {
        let mut request = request(1);
        let code = DeviceCode::generate();
        let approver = Uuid::new_v4();
        request
            .approve_item(0, approver, &code, Utc::now())
            .unwrap();
        assert_eq!(request.status, RequestStatus::FullyApproved);
        assert_eq!(request.items[0].device_id.as_ref(), Some(&code));

        let before = request.items[0].clone();
        let err = request
            .approve_item(0, approver, &DeviceCode::generate(), Utc::now())
            .unwrap_err();
        assert!(err.is(ErrorKind::AlreadyProcessed));
        assert_eq!(request.items[0].device_id, before.device_id);

        let err = request
            .reject_item(0, approver, "no", Utc::now())
            .unwrap_err();
        assert!(err.is(ErrorKind::AlreadyProcessed));
    }

    #[test]
    fn test_two_approved_one_rejected_is_partial() {
        let mut request = request(3);
        let reviewer = Uuid::new_v4();
        request
            .approve_item(0, reviewer, &DeviceCode::generate(), Utc::now())
            .unwrap();
        request
            .approve_item(1, reviewer, &DeviceCode::generate(), Utc::now())
            .unwrap();
        request
            .reject_item(2, reviewer, "Budget exhausted", Utc::now())
            .unwrap();
        assert_eq!(request.status, RequestStatus::PartiallyApproved);
        assert_eq!(
            request.items[2].rejection_reason.as_deref(),
            Some("Budget exhausted")
        );
        assert_eq!(request.notifications.len(), 4);
    }

    #[test]
    fn test_bad_index_is_not_found() {
        let request = request(1);
        let err = request.pending_item(5).unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut request = request(1);
        let err = request
            .reject_item(0, Uuid::new_v4(), "  ", Utc::now())
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(request.items[0].status, LineItemStatus::Pending);
    }

    #[test]
    fn test_provision_copies_item() {
        let request = request(2);
        let code = DeviceCode::generate();
        let credential = QrCredential::issue(&code, request.requester_id, Utc::now(), 10).unwrap();
        let new = request
            .provision(1, code.clone(), Uuid::new_v4(), credential)
            .unwrap();
        assert_eq!(new.name, "Tracker 1");
        assert_eq!(new.owner_id, request.requester_id);
        assert_eq!(new.line_item_index, 1);
        assert_eq!(new.device_id, code);
    }
}
