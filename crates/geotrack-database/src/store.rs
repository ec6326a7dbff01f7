//! Store traits implemented by the PostgreSQL repositories and the
//! in-memory store.
//!
//! Every method that reads then writes is atomic inside the store:
//! approval and rejection run under a lock on the request, and `append`
//! runs under a per-device lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_entity::device::{Device, DeviceCode, DeviceStatus, QrCredential};
use geotrack_entity::location::{
    DailySummary, LocationHistoryEntry, LocationRecord, NewLocationRecord,
};
use geotrack_entity::request::{DeviceRequest, RequestStatus};

/// Filters for listing requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Only requests submitted by this user.
    pub requester_id: Option<Uuid>,
    /// Only requests in this aggregate status.
    pub status: Option<RequestStatus>,
}

/// Inputs for approving one line item.
#[derive(Debug, Clone)]
pub struct LineItemApproval {
    /// The request.
    pub request_id: Uuid,
    /// Index of the line item.
    pub index: usize,
    /// The approver.
    pub approver_id: Uuid,
    /// Freshly generated device id.
    pub device_id: DeviceCode,
    /// Validity of the credential issued with the device.
    pub validity_days: u32,
    /// Decision time.
    pub now: DateTime<Utc>,
}

/// Inputs for rejecting one line item.
#[derive(Debug, Clone)]
pub struct LineItemRejection {
    /// The request.
    pub request_id: Uuid,
    /// Index of the line item.
    pub index: usize,
    /// The reviewer.
    pub reviewer_id: Uuid,
    /// Reason shown to the requester.
    pub reason: String,
    /// Decision time.
    pub now: DateTime<Utc>,
}

/// Time window and size bound for a history query.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Upper bound.
    pub end: Option<DateTime<Utc>>,
    /// Whether `end` itself is included.
    pub end_inclusive: bool,
    /// Maximum number of entries; the most recent ones are kept.
    pub limit: u64,
}

/// Result of appending a report.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// The stored history entry.
    pub entry: LocationHistoryEntry,
    /// The stored raw record.
    pub record: LocationRecord,
    /// The report repeated an existing `(device, recorded_at)` pair.
    pub duplicate: bool,
    /// The report was older than the latest stored entry.
    pub late: bool,
    /// Points in the entry's day bucket after the append.
    pub route_point_count: u64,
}

/// Device directory persistence.
#[async_trait]
pub trait DeviceStore: Send + Sync + 'static {
    /// Find a device by its id.
    async fn find_by_code(&self, code: &DeviceCode) -> AppResult<Option<Device>>;

    /// Check whether a device id is taken.
    async fn code_exists(&self, code: &DeviceCode) -> AppResult<bool>;

    /// List devices, newest first, optionally restricted to one owner.
    async fn list(&self, owner_id: Option<Uuid>, page: &PageRequest)
    -> AppResult<PageResponse<Device>>;

    /// Move from `from` to `to`; `Conflict` if the status is no longer `from`.
    async fn update_status(
        &self,
        code: &DeviceCode,
        from: DeviceStatus,
        to: DeviceStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Device>;

    /// Switch tracking; `Conflict` if it is already in the requested state.
    async fn set_tracking(
        &self,
        code: &DeviceCode,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Device>;

    /// Record a heartbeat, refreshing `last_seen` and the online flag.
    async fn record_telemetry(
        &self,
        code: &DeviceCode,
        battery_level: Option<i32>,
        signal_strength: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Device>;

    /// Replace the QR credential.
    async fn replace_credential(
        &self,
        code: &DeviceCode,
        credential: &QrCredential,
        now: DateTime<Utc>,
    ) -> AppResult<Device>;

    /// Clear the credential's active flag.
    async fn deactivate_credential(&self, code: &DeviceCode, now: DateTime<Utc>)
    -> AppResult<Device>;

    /// Remove a device together with its location data.
    async fn delete(&self, code: &DeviceCode) -> AppResult<()>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Device request persistence.
#[async_trait]
pub trait RequestStore: Send + Sync + 'static {
    /// Insert a new request.
    async fn create(&self, request: &DeviceRequest) -> AppResult<DeviceRequest>;

    /// Find a request by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DeviceRequest>>;

    /// List requests, newest first.
    async fn list(
        &self,
        filter: &RequestFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<DeviceRequest>>;

    /// Approve a line item, create its device and credential, all or nothing.
    ///
    /// Fails with `Conflict` if the device id is already taken.
    async fn approve_line_item(&self, approval: &LineItemApproval)
    -> AppResult<(DeviceRequest, Device)>;

    /// Reject a line item.
    async fn reject_line_item(&self, rejection: &LineItemRejection) -> AppResult<DeviceRequest>;
}

/// Location record and history persistence.
#[async_trait]
pub trait LocationStore: Send + Sync + 'static {
    /// Store a report and its history entry and refresh the device cache,
    /// serialized per device.
    async fn append(&self, report: NewLocationRecord) -> AppResult<AppendOutcome>;

    /// Entries in the window, ascending by `recorded_at`.
    async fn history(
        &self,
        code: &DeviceCode,
        window: &HistoryWindow,
    ) -> AppResult<Vec<LocationHistoryEntry>>;

    /// Per-day summaries, newest day first.
    async fn daily_summaries(&self, code: &DeviceCode) -> AppResult<Vec<DailySummary>>;

    /// Raw records, newest first.
    async fn recent_records(&self, code: &DeviceCode, limit: u64)
    -> AppResult<Vec<LocationRecord>>;

    /// Find a raw record.
    async fn find_record(&self, id: Uuid) -> AppResult<Option<LocationRecord>>;

    /// Mark one alert of a record acknowledged.
    async fn acknowledge_alert(
        &self,
        record_id: Uuid,
        index: usize,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<LocationRecord>;
}
