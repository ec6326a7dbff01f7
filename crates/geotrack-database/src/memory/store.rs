//! Process-local store backed by `DashMap` and Tokio mutexes.
//!
//! Intended for tests and single-node demos: nothing survives a restart.
//! Requests are guarded by one `tokio::sync::Mutex`; ingestion takes a
//! per-device mutex so reports for different devices proceed in parallel.
//! No `DashMap` guard is ever held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_entity::device::{Device, DeviceCode, DeviceStatus, QrCredential};
use geotrack_entity::location::{
    DailySummary, LocationHistoryEntry, LocationRecord, NewLocationRecord, Placement,
    SequencedPoint, summarize_by_day,
};
use geotrack_entity::request::DeviceRequest;

use crate::store::{
    AppendOutcome, DeviceStore, HistoryWindow, LineItemApproval, LineItemRejection, LocationStore,
    RequestFilter, RequestStore,
};

#[derive(Debug, Default)]
struct Inner {
    requests: Mutex<HashMap<Uuid, DeviceRequest>>,
    devices: DashMap<DeviceCode, Device>,
    records: DashMap<Uuid, LocationRecord>,
    /// Per-device history, kept sorted by `recorded_at`.
    history: DashMap<DeviceCode, Vec<LocationHistoryEntry>>,
    device_locks: DashMap<DeviceCode, Arc<Mutex<()>>>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn device_lock(&self, code: &DeviceCode) -> Arc<Mutex<()>> {
        self.inner
            .device_locks
            .entry(code.clone())
            .or_default()
            .clone()
    }

    fn not_found(code: &DeviceCode) -> AppError {
        AppError::not_found(format!("Device {code} not found"))
    }

    /// Apply `f` to a device in place and return the updated copy.
    fn modify_device<F>(&self, code: &DeviceCode, f: F) -> AppResult<Device>
    where
        F: FnOnce(&mut Device) -> AppResult<()>,
    {
        let mut device = self
            .inner
            .devices
            .get_mut(code)
            .ok_or_else(|| Self::not_found(code))?;
        f(device.value_mut())?;
        Ok(device.value().clone())
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn find_by_code(&self, code: &DeviceCode) -> AppResult<Option<Device>> {
        Ok(self.inner.devices.get(code).map(|d| d.value().clone()))
    }

    async fn code_exists(&self, code: &DeviceCode) -> AppResult<bool> {
        Ok(self.inner.devices.contains_key(code))
    }

    async fn list(
        &self,
        owner_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Device>> {
        let mut devices: Vec<Device> = self
            .inner
            .devices
            .iter()
            .filter(|d| owner_id.is_none_or(|owner| d.owner_id == owner))
            .map(|d| d.value().clone())
            .collect();
        devices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageResponse::from_slice(&devices, page))
    }

    async fn update_status(
        &self,
        code: &DeviceCode,
        from: DeviceStatus,
        to: DeviceStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        self.modify_device(code, |device| {
            if device.status != from {
                return Err(AppError::conflict(format!(
                    "Device {code} is no longer {from}"
                )));
            }
            device.status = to;
            device.updated_at = now;
            Ok(())
        })
    }

    async fn set_tracking(
        &self,
        code: &DeviceCode,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        self.modify_device(code, |device| {
            if device.tracking_enabled == enabled {
                let state = if enabled { "started" } else { "stopped" };
                return Err(AppError::conflict(format!(
                    "Tracking is already {state} for {code}"
                )));
            }
            device.tracking_enabled = enabled;
            if enabled {
                device.tracking_started_at = Some(now);
            } else {
                device.tracking_stopped_at = Some(now);
                device.is_online = false;
            }
            device.updated_at = now;
            Ok(())
        })
    }

    async fn record_telemetry(
        &self,
        code: &DeviceCode,
        battery_level: Option<i32>,
        signal_strength: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        self.modify_device(code, |device| {
            if battery_level.is_some() {
                device.battery_level = battery_level;
            }
            if signal_strength.is_some() {
                device.signal_strength = signal_strength;
            }
            device.last_seen = Some(now);
            device.is_online = true;
            device.updated_at = now;
            Ok(())
        })
    }

    async fn replace_credential(
        &self,
        code: &DeviceCode,
        credential: &QrCredential,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        self.modify_device(code, |device| {
            device.set_credential(credential.clone());
            device.updated_at = now;
            Ok(())
        })
    }

    async fn deactivate_credential(
        &self,
        code: &DeviceCode,
        now: DateTime<Utc>,
    ) -> AppResult<Device> {
        self.modify_device(code, |device| {
            device.qr_active = false;
            device.updated_at = now;
            Ok(())
        })
    }

    async fn delete(&self, code: &DeviceCode) -> AppResult<()> {
        let lock = self.device_lock(code);
        let _guard = lock.lock().await;

        if self.inner.devices.remove(code).is_none() {
            return Err(Self::not_found(code));
        }
        self.inner.history.remove(code);
        self.inner.records.retain(|_, record| &record.device_id != code);
        self.inner.device_locks.remove(code);
        debug!(device_id = %code, "Device removed from memory store");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create(&self, request: &DeviceRequest) -> AppResult<DeviceRequest> {
        let mut requests = self.inner.requests.lock().await;
        if requests.contains_key(&request.id) {
            return Err(AppError::conflict(format!(
                "Request {} already exists",
                request.id
            )));
        }
        requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeviceRequest>> {
        Ok(self.inner.requests.lock().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &RequestFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<DeviceRequest>> {
        let requests = self.inner.requests.lock().await;
        let mut matching: Vec<DeviceRequest> = requests
            .values()
            .filter(|r| filter.requester_id.is_none_or(|id| r.requester_id == id))
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .cloned()
            .collect();
        drop(requests);
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageResponse::from_slice(&matching, page))
    }

    async fn approve_line_item(
        &self,
        approval: &LineItemApproval,
    ) -> AppResult<(DeviceRequest, Device)> {
        let mut requests = self.inner.requests.lock().await;
        let current = requests.get(&approval.request_id).ok_or_else(|| {
            AppError::not_found(format!("Request {} not found", approval.request_id))
        })?;

        // Everything fallible runs on a copy before any map is touched.
        let mut updated = current.clone();
        let credential = QrCredential::issue(
            &approval.device_id,
            updated.requester_id,
            approval.now,
            approval.validity_days,
        )?;
        let new_device = updated.provision(
            approval.index,
            approval.device_id.clone(),
            approval.approver_id,
            credential,
        )?;
        updated.approve_item(
            approval.index,
            approval.approver_id,
            &approval.device_id,
            approval.now,
        )?;

        let device = Device::from_new(new_device, approval.now);
        match self.inner.devices.entry(approval.device_id.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::conflict(format!(
                    "Device id {} is already taken",
                    approval.device_id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(device.clone());
            }
        }
        requests.insert(updated.id, updated.clone());
        Ok((updated, device))
    }

    async fn reject_line_item(&self, rejection: &LineItemRejection) -> AppResult<DeviceRequest> {
        let mut requests = self.inner.requests.lock().await;
        let request = requests.get_mut(&rejection.request_id).ok_or_else(|| {
            AppError::not_found(format!("Request {} not found", rejection.request_id))
        })?;
        request.reject_item(
            rejection.index,
            rejection.reviewer_id,
            &rejection.reason,
            rejection.now,
        )?;
        Ok(request.clone())
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn append(&self, report: NewLocationRecord) -> AppResult<AppendOutcome> {
        let code = report.device_id.clone();
        let lock = self.device_lock(&code);
        let _guard = lock.lock().await;

        let device_name = self
            .inner
            .devices
            .get(&code)
            .map(|d| d.name.clone())
            .ok_or_else(|| Self::not_found(&code))?;

        let mut series = self.inner.history.entry(code.clone()).or_default();

        if let Some(existing) = series.iter().find(|e| e.recorded_at == report.recorded_at) {
            let entry = existing.clone();
            let route_point_count = series
                .iter()
                .filter(|e| e.route_id == entry.route_id)
                .count();
            drop(series);
            let record = self
                .inner
                .records
                .get(&entry.record_id)
                .map(|r| r.value().clone())
                .ok_or_else(|| {
                    AppError::internal(format!("History entry {} has no record", entry.id))
                })?;
            return Ok(AppendOutcome {
                entry,
                record,
                duplicate: true,
                late: false,
                route_point_count: route_point_count as u64,
            });
        }

        // Entries are sorted, so the insertion point splits predecessors from successors.
        let position = series.partition_point(|e| e.recorded_at < report.recorded_at);
        let latest = series.last().cloned();
        let predecessor = position.checked_sub(1).and_then(|i| series.get(i)).cloned();
        let successor = series.get(position).cloned();

        let placed = SequencedPoint::place(
            &code,
            report.point,
            report.recorded_at,
            latest.as_ref(),
            predecessor.as_ref(),
            successor.as_ref(),
        );
        let placement = placed.placement;
        let closes_previous = placed.closes_previous_route;
        let takes_start = placed.takes_route_start;
        let takes_end = placed.takes_route_end;
        let moves_cache = placed.updates_last_known_location();

        let record = report.into_record();
        let entry = placed.into_entry(&record, &device_name);

        if closes_previous && let Some(last) = series.last_mut() {
            last.is_route_end = true;
        }
        if takes_start && let Some(next) = series.get_mut(position) {
            next.is_route_start = false;
        }
        if takes_end
            && let Some(index) = position.checked_sub(1)
            && let Some(prev) = series.get_mut(index)
        {
            prev.is_route_end = false;
        }
        series.insert(position, entry.clone());
        let route_point_count = series
            .iter()
            .filter(|e| e.route_id == entry.route_id)
            .count();
        drop(series);

        self.inner.records.insert(record.id, record.clone());
        if let Some(mut device) = self.inner.devices.get_mut(&code) {
            if moves_cache {
                device.last_latitude = Some(record.latitude);
                device.last_longitude = Some(record.longitude);
                device.last_accuracy = record.accuracy;
                device.last_location_at = Some(record.recorded_at);
                device.last_address = record.address.clone();
            }
            device.last_seen = Some(
                device
                    .last_seen
                    .map_or(record.received_at, |seen| seen.max(record.received_at)),
            );
            device.is_online = true;
            device.updated_at = record.received_at;
        }

        Ok(AppendOutcome {
            entry,
            record,
            duplicate: false,
            late: placement == Placement::Late,
            route_point_count: route_point_count as u64,
        })
    }

    async fn history(
        &self,
        code: &DeviceCode,
        window: &HistoryWindow,
    ) -> AppResult<Vec<LocationHistoryEntry>> {
        let Some(series) = self.inner.history.get(code) else {
            return Ok(Vec::new());
        };
        let in_window: Vec<LocationHistoryEntry> = series
            .iter()
            .filter(|e| window.start.is_none_or(|start| e.recorded_at >= start))
            .filter(|e| {
                window.end.is_none_or(|end| {
                    if window.end_inclusive {
                        e.recorded_at <= end
                    } else {
                        e.recorded_at < end
                    }
                })
            })
            .cloned()
            .collect();
        drop(series);

        let skip = in_window.len().saturating_sub(window.limit as usize);
        Ok(in_window.into_iter().skip(skip).collect())
    }

    async fn daily_summaries(&self, code: &DeviceCode) -> AppResult<Vec<DailySummary>> {
        Ok(self
            .inner
            .history
            .get(code)
            .map(|series| summarize_by_day(series.iter()))
            .unwrap_or_default())
    }

    async fn recent_records(
        &self,
        code: &DeviceCode,
        limit: u64,
    ) -> AppResult<Vec<LocationRecord>> {
        let mut records: Vec<LocationRecord> = self
            .inner
            .records
            .iter()
            .filter(|r| &r.device_id == code)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then(b.received_at.cmp(&a.received_at))
        });
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn find_record(&self, id: Uuid) -> AppResult<Option<LocationRecord>> {
        Ok(self.inner.records.get(&id).map(|r| r.value().clone()))
    }

    async fn acknowledge_alert(
        &self,
        record_id: Uuid,
        index: usize,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<LocationRecord> {
        let mut record = self.inner.records.get_mut(&record_id).ok_or_else(|| {
            AppError::not_found(format!("Location record {record_id} not found"))
        })?;
        let alert = record.alerts.get_mut(index).ok_or_else(|| {
            AppError::not_found(format!("Location record {record_id} has no alert {index}"))
        })?;
        alert.acknowledge(user_id, now);
        Ok(record.value().clone())
    }
}
