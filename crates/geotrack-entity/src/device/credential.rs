//! Time-bound QR credentials.
//!
//! The payload printed into the QR code is the URL-safe base64 encoding of
//! a small JSON document:
//!
//! ```json
//! {"deviceId":"DEV-7K2MPQ9X","ownerId":"…","issuedAt":"…","validUntil":"…","status":"active"}
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use geotrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::code::DeviceCode;

/// Status marker embedded in every freshly issued payload.
pub const PAYLOAD_STATUS_ACTIVE: &str = "active";

/// Decoded QR payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    /// Device the credential is bound to.
    pub device_id: DeviceCode,
    /// Owner at issue time.
    pub owner_id: Uuid,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Always `"active"` when issued.
    pub status: String,
}

impl QrPayload {
    /// Encode as the opaque string stored on the device and printed in the QR code.
    pub fn encode(&self) -> AppResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode an opaque payload string.
    pub fn decode(raw: &str) -> AppResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|e| AppError::validation(format!("Malformed QR payload: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::validation(format!("Malformed QR payload: {e}")))
    }
}

/// The credential stored on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrCredential {
    /// Opaque encoded [`QrPayload`].
    pub payload: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Cleared by an explicit deactivation.
    pub is_active: bool,
}

impl QrCredential {
    /// Issue a credential valid for `validity_days` from `now`.
    pub fn issue(
        device_id: &DeviceCode,
        owner_id: Uuid,
        now: DateTime<Utc>,
        validity_days: u32,
    ) -> AppResult<Self> {
        if validity_days == 0 {
            return Err(AppError::validation(
                "Credential validity must be at least one day",
            ));
        }
        let valid_until = now + Duration::days(i64::from(validity_days));
        let payload = QrPayload {
            device_id: device_id.clone(),
            owner_id,
            issued_at: now,
            valid_until,
            status: PAYLOAD_STATUS_ACTIVE.to_string(),
        }
        .encode()?;

        Ok(Self {
            payload,
            issued_at: now,
            valid_until,
            is_active: true,
        })
    }

    /// Check the credential at `now` and return its decoded payload.
    ///
    /// Expiry is checked first, so an expired credential reports
    /// `CredentialExpired` whatever its active flag says.
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<QrPayload> {
        if self.valid_until < now {
            return Err(AppError::credential_expired(format!(
                "QR credential expired at {}",
                self.valid_until.to_rfc3339()
            )));
        }
        if !self.is_active {
            return Err(AppError::credential_inactive(
                "QR credential has been deactivated",
            ));
        }
        QrPayload::decode(&self.payload)
    }
}
