//! Time-bound QR credentials bound to device identities.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use geotrack_core::config::{CredentialConfig, TrackingConfig};
use geotrack_core::error::AppError;
use geotrack_core::events::DeviceEvent;
use geotrack_core::result::AppResult;
use geotrack_database::DeviceStore;
use geotrack_entity::device::{
    Device, DeviceCode, DeviceStatus, LastKnownLocation, QrCredential, QrPayload, TrackingState,
};

use crate::context::RequestContext;
use crate::notification::EventDispatcher;

/// Resolve a requested validity window against configuration.
///
/// `None` picks the configured default; zero or anything above the
/// configured maximum is rejected.
pub fn resolve_validity_days(config: &CredentialConfig, requested: Option<u32>) -> AppResult<u32> {
    let days = requested.unwrap_or(config.default_validity_days);
    if days == 0 || days > config.max_validity_days {
        return Err(AppError::validation(format!(
            "Validity must be between 1 and {} days, got {days}",
            config.max_validity_days
        )));
    }
    Ok(days)
}

/// The credential as handed to its owner for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialView {
    /// Device id.
    pub device_id: DeviceCode,
    /// Opaque payload to encode in the QR image.
    pub payload: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Active flag.
    pub is_active: bool,
    /// Whether the credential can be used right now.
    pub is_valid: bool,
}

impl CredentialView {
    fn of(device: &Device, now: DateTime<Utc>) -> Self {
        let credential = device.credential();
        Self {
            device_id: device.device_id.clone(),
            is_valid: credential.validate(now).is_ok(),
            payload: credential.payload,
            issued_at: credential.issued_at,
            valid_until: credential.valid_until,
            is_active: credential.is_active,
        }
    }
}

/// Read-only device snapshot returned by a successful scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    /// Device id.
    pub device_id: DeviceCode,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: Option<String>,
    /// Lifecycle status.
    pub status: DeviceStatus,
    /// Owner.
    pub owner_id: Uuid,
    /// Cached last location.
    pub last_location: Option<LastKnownLocation>,
    /// Battery percentage.
    pub battery_level: Option<i32>,
    /// Signal percentage.
    pub signal_strength: Option<i32>,
    /// Tracking flag.
    pub tracking_enabled: bool,
    /// Derived tracking sub-state.
    pub tracking_state: TrackingState,
    /// Last heartbeat or report.
    pub last_seen: Option<DateTime<Utc>>,
    /// End of the scanned credential's validity window.
    pub credential_valid_until: DateTime<Utc>,
}

/// Issues, validates, regenerates, deactivates and scans QR credentials.
#[derive(Clone)]
pub struct CredentialService {
    /// Device directory.
    devices: Arc<dyn DeviceStore>,
    /// Post-commit notifications.
    dispatcher: EventDispatcher,
    /// Validity settings.
    config: CredentialConfig,
    /// Online threshold for scan snapshots.
    online_threshold: Duration,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    /// Creates a new credential service.
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        dispatcher: EventDispatcher,
        config: CredentialConfig,
        tracking: &TrackingConfig,
    ) -> Self {
        Self {
            devices,
            dispatcher,
            config,
            online_threshold: Duration::seconds(tracking.online_threshold_seconds),
        }
    }

    /// Build a fresh credential for `device` without storing it.
    pub fn issue(&self, device: &Device, validity_days: Option<u32>) -> AppResult<QrCredential> {
        let days = resolve_validity_days(&self.config, validity_days)?;
        QrCredential::issue(&device.device_id, device.owner_id, Utc::now(), days)
    }

    /// Current credential of a device (owner or elevated).
    pub async fn get_credential(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<CredentialView> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;
        Ok(CredentialView::of(&device, Utc::now()))
    }

    /// Validate the stored credential and return its payload.
    pub async fn validate(&self, ctx: &RequestContext, code: &DeviceCode) -> AppResult<QrPayload> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;
        let payload = device.credential().validate(Utc::now())?;
        debug!(device_id = %code, "Credential validated");
        Ok(payload)
    }

    /// Replace the credential with a fresh, active one (owner or elevated).
    pub async fn regenerate(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        validity_days: Option<u32>,
    ) -> AppResult<CredentialView> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;

        let credential = self.issue(&device, validity_days)?;
        let now = credential.issued_at;
        let device = self
            .devices
            .replace_credential(code, &credential, now)
            .await?;

        info!(
            user_id = %ctx.user_id,
            device_id = %code,
            valid_until = %credential.valid_until,
            "QR credential regenerated"
        );
        self.dispatcher
            .dispatch(
                ctx.user_id,
                DeviceEvent::CredentialRegenerated {
                    device_id: code.to_string(),
                },
            )
            .await;

        Ok(CredentialView::of(&device, now))
    }

    /// Deactivate the credential (elevated only). History and telemetry are untouched.
    pub async fn deactivate(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<CredentialView> {
        ctx.require_elevated("deactivate credentials")?;
        let now = Utc::now();
        let device = self.devices.deactivate_credential(code, now).await?;

        info!(user_id = %ctx.user_id, device_id = %code, "QR credential deactivated");
        self.dispatcher
            .dispatch(
                ctx.user_id,
                DeviceEvent::CredentialDeactivated {
                    device_id: code.to_string(),
                },
            )
            .await;

        Ok(CredentialView::of(&device, now))
    }

    /// Resolve a scanned payload to a read-only device snapshot.
    ///
    /// Never mutates the device or records a location.
    pub async fn scan(&self, ctx: &RequestContext, raw_payload: &str) -> AppResult<ScanSnapshot> {
        let scanned = QrPayload::decode(raw_payload)?;
        let device = self.load(&scanned.device_id).await?;
        ctx.require_device_access(&device)?;

        let now = Utc::now();
        let current = device.credential().validate(now)?;
        if current != scanned {
            return Err(AppError::credential_inactive(
                "QR code has been superseded by a newer credential",
            ));
        }

        debug!(user_id = %ctx.user_id, device_id = %device.device_id, "QR credential scanned");

        Ok(ScanSnapshot {
            tracking_state: device.tracking_state(now, self.online_threshold),
            last_location: device.last_known_location(),
            credential_valid_until: device.qr_valid_until,
            device_id: device.device_id,
            name: device.name,
            category: device.category,
            status: device.status,
            owner_id: device.owner_id,
            battery_level: device.battery_level,
            signal_strength: device.signal_strength,
            tracking_enabled: device.tracking_enabled,
            last_seen: device.last_seen,
        })
    }

    async fn load(&self, code: &DeviceCode) -> AppResult<Device> {
        self.devices
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrack_core::error::ErrorKind;
    use geotrack_database::MemoryStore;

    use crate::test_support::{admin, manager, provision, service_with_store, user};

    #[test]
    fn test_resolve_validity_days() {
        let config = CredentialConfig::default();
        assert_eq!(resolve_validity_days(&config, None).unwrap(), 365);
        assert_eq!(resolve_validity_days(&config, Some(7)).unwrap(), 7);
        assert!(resolve_validity_days(&config, Some(0)).is_err());
        assert!(resolve_validity_days(&config, Some(3651)).is_err());
    }

    #[tokio::test]
    async fn test_owner_scan_returns_snapshot_without_mutation() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let snapshot = services
            .credentials
            .scan(&owner, &device.qr_payload)
            .await
            .unwrap();
        assert_eq!(snapshot.device_id, device.device_id);
        assert_eq!(snapshot.status, DeviceStatus::Approved);
        assert_eq!(snapshot.tracking_state, TrackingState::Disabled);
        assert!(snapshot.last_location.is_none());

        let after = store
            .find_by_code(&device.device_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.updated_at, device.updated_at);
        assert!(after.last_seen.is_none());
    }

    #[tokio::test]
    async fn test_scan_by_stranger_is_forbidden() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let device = provision(&services, &user()).await;

        let err = services
            .credentials
            .scan(&user(), &device.qr_payload)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
        assert!(
            services
                .credentials
                .scan(&manager(), &device.qr_payload)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_scan_rejects_garbage_and_unknown_devices() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();

        let err = services.credentials.scan(&owner, "%%%").await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));

        let orphan = QrCredential::issue(
            &DeviceCode::parse("DEV-ZZZZ2222").unwrap(),
            owner.user_id,
            Utc::now(),
            10,
        )
        .unwrap();
        let err = services
            .credentials
            .scan(&owner, &orphan.payload)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_deactivate_is_elevated_only_and_blocks_scan() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let err = services
            .credentials
            .deactivate(&owner, &device.device_id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));

        let view = services
            .credentials
            .deactivate(&admin(), &device.device_id)
            .await
            .unwrap();
        assert!(!view.is_active);
        assert!(!view.is_valid);

        let err = services
            .credentials
            .validate(&owner, &device.device_id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CredentialInactive));
        let err = services
            .credentials
            .scan(&owner, &device.qr_payload)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CredentialInactive));
    }

    #[tokio::test]
    async fn test_regenerate_reactivates_and_supersedes_old_payload() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;
        services
            .credentials
            .deactivate(&manager(), &device.device_id)
            .await
            .unwrap();

        let view = services
            .credentials
            .regenerate(&owner, &device.device_id, Some(90))
            .await
            .unwrap();
        assert!(view.is_active);
        assert!(view.is_valid);
        assert_ne!(view.payload, device.qr_payload);
        assert_eq!((view.valid_until - view.issued_at).num_days(), 90);

        let err = services
            .credentials
            .scan(&owner, &device.qr_payload)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CredentialInactive));
        assert!(services.credentials.scan(&owner, &view.payload).await.is_ok());
    }

    #[tokio::test]
    async fn test_regenerate_by_stranger_is_forbidden() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let device = provision(&services, &user()).await;

        let err = services
            .credentials
            .regenerate(&user(), &device.device_id, None)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn test_expired_credential_fails_even_when_active() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let past = Utc::now() - Duration::days(30);
        let stale = QrCredential::issue(&device.device_id, owner.user_id, past, 1).unwrap();
        store
            .replace_credential(&device.device_id, &stale, past)
            .await
            .unwrap();

        let err = services
            .credentials
            .validate(&owner, &device.device_id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CredentialExpired));
        let err = services
            .credentials
            .scan(&owner, &stale.payload)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CredentialExpired));
    }

    #[tokio::test]
    async fn test_get_credential_for_owner() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let view = services
            .credentials
            .get_credential(&owner, &device.device_id)
            .await
            .unwrap();
        assert_eq!(view.payload, device.qr_payload);
        assert!(view.is_valid);

        let payload = services
            .credentials
            .validate(&owner, &device.device_id)
            .await
            .unwrap();
        assert_eq!(payload.owner_id, owner.user_id);
    }
}
