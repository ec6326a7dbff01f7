//! Domain events emitted by GeoTrack operations.
//!
//! Events are raised only after the owning transaction commits and are
//! handed to an [`EventNotifier`](crate::traits::EventNotifier).

pub mod device;
pub mod request;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use device::DeviceEvent;
pub use request::RequestEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A device-request event.
    Request(RequestEvent),
    /// A device lifecycle event.
    Device(DeviceEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// Short, stable name of the event used in log lines.
    pub fn name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Request(e) => e.name(),
            EventPayload::Device(e) => e.name(),
        }
    }
}

impl From<RequestEvent> for EventPayload {
    fn from(event: RequestEvent) -> Self {
        Self::Request(event)
    }
}

impl From<DeviceEvent> for EventPayload {
    fn from(event: DeviceEvent) -> Self {
        Self::Device(event)
    }
}
