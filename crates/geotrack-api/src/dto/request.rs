//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use geotrack_entity::device::DeviceStatus;
use geotrack_entity::location::{AlertSeverity, LocationSource, NewLocationAlert};
use geotrack_entity::request::{NewLineItem, RequestPriority, RequestStatus};
use geotrack_service::device::Telemetry;
use geotrack_service::location::{HistoryQuery, LocationReport};
use geotrack_service::request::SubmitRequest;

/// One requested device.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    /// Device name.
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    /// Intended use.
    #[validate(length(min = 1, max = 2000, message = "purpose is required"))]
    pub purpose: String,
    /// Hardware model.
    #[validate(length(max = 200))]
    pub model: Option<String>,
    /// Category.
    #[validate(length(max = 100))]
    pub category: Option<String>,
}

/// Submit a multi-device request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitDeviceRequest {
    /// Requested devices.
    #[validate(length(min = 1, max = 50, message = "between 1 and 50 items are required"), nested)]
    pub items: Vec<LineItemRequest>,
    /// Review priority.
    pub priority: Option<RequestPriority>,
    /// Requesting department.
    #[validate(length(max = 200))]
    pub department: Option<String>,
}

impl From<SubmitDeviceRequest> for SubmitRequest {
    fn from(req: SubmitDeviceRequest) -> Self {
        Self {
            items: req
                .items
                .into_iter()
                .map(|item| NewLineItem {
                    name: item.name,
                    purpose: item.purpose,
                    model: item.model,
                    category: item.category,
                })
                .collect(),
            priority: req.priority,
            department: req.department,
        }
    }
}

/// Reject a line item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectItemRequest {
    /// Reason shown to the requester.
    #[validate(length(min = 1, max = 2000, message = "reason is required"))]
    pub reason: String,
}

/// Administrative status change.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: DeviceStatus,
}

/// Battery/signal heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryRequest {
    /// Battery percentage.
    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,
    /// Signal percentage.
    #[validate(range(min = 0, max = 100))]
    pub signal_strength: Option<i32>,
}

impl From<TelemetryRequest> for Telemetry {
    fn from(req: TelemetryRequest) -> Self {
        Self {
            battery_level: req.battery_level,
            signal_strength: req.signal_strength,
        }
    }
}

/// A scanned QR payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanRequest {
    /// Opaque payload read from the QR code.
    #[validate(length(min = 1, max = 4096, message = "payload is required"))]
    pub payload: String,
}

/// Alert attached to a location report.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlertRequest {
    /// Alert type.
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub alert_type: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Text.
    #[validate(length(max = 1000))]
    pub message: String,
}

/// Location report.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestLocationRequest {
    /// Reporting device.
    #[serde(alias = "deviceId")]
    #[validate(length(min = 1, max = 32, message = "device_id is required"))]
    pub device_id: String,
    /// Latitude.
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    /// Longitude.
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: Option<f64>,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Speed in m/s.
    pub speed: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Address.
    #[validate(length(max = 500))]
    pub address: Option<String>,
    /// Fix source.
    pub source: Option<LocationSource>,
    /// Device clock time.
    #[serde(alias = "recordedAt", alias = "timestamp")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Alerts.
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub alerts: Vec<AlertRequest>,
}

impl From<IngestLocationRequest> for LocationReport {
    fn from(req: IngestLocationRequest) -> Self {
        Self {
            device_id: req.device_id,
            latitude: req.latitude,
            longitude: req.longitude,
            accuracy: req.accuracy,
            speed: req.speed,
            heading: req.heading,
            altitude: req.altitude,
            address: req.address,
            source: req.source,
            recorded_at: req.recorded_at,
            alerts: req
                .alerts
                .into_iter()
                .map(|a| NewLocationAlert {
                    alert_type: a.alert_type,
                    severity: a.severity,
                    message: a.message,
                })
                .collect(),
        }
    }
}

/// Query for `GET /api/requests`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestListParams {
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page.
    pub per_page: Option<u64>,
    /// Aggregate status filter.
    pub status: Option<RequestStatus>,
}

/// Optional credential validity override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidityParams {
    /// Validity window in days.
    pub validity_days: Option<u32>,
}

/// Query for the history endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryParams {
    /// Inclusive lower bound.
    #[serde(alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    #[serde(alias = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    /// Maximum number of points.
    pub limit: Option<u64>,
}

impl From<HistoryParams> for HistoryQuery {
    fn from(params: HistoryParams) -> Self {
        Self {
            start_date: params.start_date,
            end_date: params.end_date,
            limit: params.limit,
        }
    }
}

/// Query for the recent-records endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitParams {
    /// Maximum number of records.
    pub limit: Option<u64>,
}
