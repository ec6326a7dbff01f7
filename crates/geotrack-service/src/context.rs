//! Request context carrying the authenticated actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_entity::device::Device;
use geotrack_entity::user::UserRole;

/// Context for the current authenticated request.
///
/// Built from the verified bearer token and passed into service methods
/// so that every operation knows *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// The user's role at the time the token was issued.
    pub role: UserRole,
    /// Display name from the token, if any.
    pub name: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: Uuid, role: UserRole, name: Option<String>) -> Self {
        Self {
            user_id,
            role,
            name,
            request_time: Utc::now(),
        }
    }

    /// Returns whether the current user holds an elevated role.
    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }

    /// Fail unless the current user holds an elevated role.
    pub fn require_elevated(&self, action: &str) -> AppResult<()> {
        if self.is_elevated() {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "Only admins and managers may {action}"
            )))
        }
    }

    /// Fail unless the current user owns the device or is elevated.
    pub fn require_device_access(&self, device: &Device) -> AppResult<()> {
        if self.is_elevated() || device.is_owned_by(self.user_id) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "Not allowed to access device {}",
                device.device_id
            )))
        }
    }
}
