//! Directory reads, administrative status changes, tracking and telemetry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use geotrack_core::config::TrackingConfig;
use geotrack_core::error::AppError;
use geotrack_core::events::DeviceEvent;
use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_database::DeviceStore;
use geotrack_entity::device::{Device, DeviceCode, DeviceStatus, LastKnownLocation, TrackingState};

use crate::context::RequestContext;
use crate::notification::EventDispatcher;

/// A device together with its derived tracking sub-state.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    /// The stored device.
    #[serde(flatten)]
    pub device: Device,
    /// Derived tracking sub-state.
    pub tracking_state: TrackingState,
}

/// Cached location plus tracking state.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentLocation {
    /// Device id.
    pub device_id: DeviceCode,
    /// Display name.
    pub name: String,
    /// Last accepted location, if any.
    pub location: Option<LastKnownLocation>,
    /// Tracking flag.
    pub tracking_enabled: bool,
    /// Derived tracking sub-state.
    pub tracking_state: TrackingState,
    /// Last heartbeat or report.
    pub last_seen: Option<DateTime<Utc>>,
    /// Battery percentage.
    pub battery_level: Option<i32>,
}

/// Heartbeat payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Telemetry {
    /// Battery percentage, 0-100.
    pub battery_level: Option<i32>,
    /// Signal percentage, 0-100.
    pub signal_strength: Option<i32>,
}

impl Telemetry {
    fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("battery_level", self.battery_level),
            ("signal_strength", self.signal_strength),
        ] {
            if let Some(v) = value
                && !(0..=100).contains(&v)
            {
                return Err(AppError::validation(format!(
                    "{field} must be between 0 and 100, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Device directory service.
#[derive(Clone)]
pub struct DeviceService {
    /// Device persistence.
    devices: Arc<dyn DeviceStore>,
    /// Post-commit notifications.
    dispatcher: EventDispatcher,
    /// Staleness window for the online sub-state.
    online_threshold: Duration,
}

impl std::fmt::Debug for DeviceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceService")
            .field("online_threshold", &self.online_threshold)
            .finish_non_exhaustive()
    }
}

impl DeviceService {
    /// Creates a new device service.
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        dispatcher: EventDispatcher,
        tracking: &TrackingConfig,
    ) -> Self {
        Self {
            devices,
            dispatcher,
            online_threshold: Duration::seconds(tracking.online_threshold_seconds),
        }
    }

    fn view(&self, device: Device) -> DeviceView {
        DeviceView {
            tracking_state: device.tracking_state(Utc::now(), self.online_threshold),
            device,
        }
    }

    /// Load a device the actor may access.
    pub async fn get_device(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<DeviceView> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;
        Ok(self.view(device))
    }

    /// List devices. Regular users see only the devices they own.
    pub async fn list_devices(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<DeviceView>> {
        let owner = (!ctx.is_elevated()).then_some(ctx.user_id);
        let result = self.devices.list(owner, page).await?;
        debug!(user_id = %ctx.user_id, total = result.total_items, "Listed devices");

        let items = result.items.into_iter().map(|d| self.view(d)).collect();
        Ok(PageResponse::new(
            items,
            result.page,
            result.page_size,
            result.total_items,
        ))
    }

    /// Administrative status change along the transition table.
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        status: DeviceStatus,
    ) -> AppResult<DeviceView> {
        ctx.require_elevated("change device status")?;
        let device = self.load(code).await?;
        let current = device.status;
        if current == status {
            return Err(AppError::validation(format!(
                "Device {code} is already {status}"
            )));
        }
        if !current.can_transition_to(status) {
            return Err(AppError::validation(format!(
                "Cannot move device {code} from {current} to {status}"
            )));
        }

        let device = self
            .devices
            .update_status(code, current, status, Utc::now())
            .await?;

        info!(
            user_id = %ctx.user_id,
            device_id = %code,
            from = %current,
            to = %status,
            "Device status changed"
        );
        self.dispatcher
            .dispatch(
                ctx.user_id,
                DeviceEvent::StatusChanged {
                    device_id: code.to_string(),
                    old_status: current.to_string(),
                    new_status: status.to_string(),
                },
            )
            .await;

        Ok(self.view(device))
    }

    /// Switch tracking on.
    pub async fn start_tracking(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<DeviceView> {
        self.set_tracking(ctx, code, true).await
    }

    /// Switch tracking off.
    pub async fn stop_tracking(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<DeviceView> {
        self.set_tracking(ctx, code, false).await
    }

    async fn set_tracking(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        enabled: bool,
    ) -> AppResult<DeviceView> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;

        let device = self.devices.set_tracking(code, enabled, Utc::now()).await?;

        let event = if enabled {
            info!(user_id = %ctx.user_id, device_id = %code, "Tracking started");
            DeviceEvent::TrackingStarted {
                device_id: code.to_string(),
            }
        } else {
            info!(user_id = %ctx.user_id, device_id = %code, "Tracking stopped");
            DeviceEvent::TrackingStopped {
                device_id: code.to_string(),
            }
        };
        self.dispatcher.dispatch(ctx.user_id, event).await;

        Ok(self.view(device))
    }

    /// Record a battery/signal heartbeat.
    pub async fn report_telemetry(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        telemetry: Telemetry,
    ) -> AppResult<DeviceView> {
        telemetry.validate()?;
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;

        let device = self
            .devices
            .record_telemetry(
                code,
                telemetry.battery_level,
                telemetry.signal_strength,
                Utc::now(),
            )
            .await?;
        debug!(
            device_id = %code,
            battery = ?telemetry.battery_level,
            signal = ?telemetry.signal_strength,
            "Telemetry recorded"
        );
        Ok(self.view(device))
    }

    /// Remove a device and its location data (elevated only).
    pub async fn delete_device(&self, ctx: &RequestContext, code: &DeviceCode) -> AppResult<()> {
        ctx.require_elevated("delete devices")?;
        self.devices.delete(code).await?;

        info!(user_id = %ctx.user_id, device_id = %code, "Device deleted");
        self.dispatcher
            .dispatch(
                ctx.user_id,
                DeviceEvent::Deleted {
                    device_id: code.to_string(),
                },
            )
            .await;
        Ok(())
    }

    /// Cached last location and tracking state.
    pub async fn current_location(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<CurrentLocation> {
        let device = self.load(code).await?;
        ctx.require_device_access(&device)?;
        Ok(CurrentLocation {
            location: device.last_known_location(),
            tracking_state: device.tracking_state(Utc::now(), self.online_threshold),
            device_id: device.device_id,
            name: device.name,
            tracking_enabled: device.tracking_enabled,
            last_seen: device.last_seen,
            battery_level: device.battery_level,
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

    #[tokio::test]
    async fn test_owner_and_elevated_can_read_strangers_cannot() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let view = services
            .devices
            .get_device(&owner, &device.device_id)
            .await
            .unwrap();
        assert_eq!(view.device.status, DeviceStatus::Approved);
        assert_eq!(view.tracking_state, TrackingState::Disabled);
        assert!(
            services
                .devices
                .get_device(&admin(), &device.device_id)
                .await
                .is_ok()
        );
        let err = services
            .devices
            .get_device(&user(), &device.device_id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let alice = user();
        provision(&services, &alice).await;
        provision(&services, &user()).await;

        let page = PageRequest::default();
        let own = services.devices.list_devices(&alice, &page).await.unwrap();
        assert_eq!(own.total_items, 1);
        assert!(own.items.iter().all(|v| v.device.owner_id == alice.user_id));
        let all = services
            .devices
            .list_devices(&manager(), &page)
            .await
            .unwrap();
        assert_eq!(all.total_items, 2);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;
        let code = &device.device_id;
        let admin = admin();

        let err = services
            .devices
            .update_status(&owner, code, DeviceStatus::Active)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));

        let view = services
            .devices
            .update_status(&admin, code, DeviceStatus::Active)
            .await
            .unwrap();
        assert_eq!(view.device.status, DeviceStatus::Active);

        let err = services
            .devices
            .update_status(&admin, code, DeviceStatus::Active)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        let err = services
            .devices
            .update_status(&admin, code, DeviceStatus::Approved)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));

        let view = services
            .devices
            .update_status(&admin, code, DeviceStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(view.device.status, DeviceStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_tracking_start_stop() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;
        let code = &device.device_id;

        let view = services.devices.start_tracking(&owner, code).await.unwrap();
        assert!(view.device.tracking_enabled);
        assert!(view.device.tracking_started_at.is_some());
        assert_eq!(view.tracking_state, TrackingState::Offline);

        let err = services
            .devices
            .start_tracking(&owner, code)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));

        let view = services
            .devices
            .report_telemetry(
                &owner,
                code,
                Telemetry {
                    battery_level: Some(80),
                    signal_strength: Some(60),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.tracking_state, TrackingState::Online);
        assert_eq!(view.device.battery_level, Some(80));

        let view = services.devices.stop_tracking(&owner, code).await.unwrap();
        assert_eq!(view.tracking_state, TrackingState::Disabled);
        let err = services
            .devices
            .stop_tracking(&owner, code)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));

        let err = services
            .devices
            .start_tracking(&user(), code)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn test_telemetry_bounds() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let err = services
            .devices
            .report_telemetry(
                &owner,
                &device.device_id,
                Telemetry {
                    battery_level: Some(101),
                    signal_strength: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_delete_is_elevated_only() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;
        let code = &device.device_id;

        let err = services
            .devices
            .delete_device(&owner, code)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));

        services
            .devices
            .delete_device(&manager(), code)
            .await
            .unwrap();
        let err = services.devices.get_device(&owner, code).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        let err = services
            .devices
            .delete_device(&manager(), code)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_current_location_before_any_report() {
        let store = MemoryStore::new();
        let services = service_with_store(&store);
        let owner = user();
        let device = provision(&services, &owner).await;

        let current = services
            .devices
            .current_location(&owner, &device.device_id)
            .await
            .unwrap();
        assert!(current.location.is_none());
        assert_eq!(current.tracking_state, TrackingState::Disabled);
    }
}
