//! Fire-and-forget delivery of domain events.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use geotrack_core::events::{DomainEvent, EventPayload};
use geotrack_core::result::AppResult;
use geotrack_core::traits::EventNotifier;

/// Notifier that writes events to the log. Email delivery lives outside
/// this service.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl EventNotifier for LogNotifier {
    async fn notify(&self, event: &DomainEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event.payload)?;
        info!(
            event_id = %event.id,
            event = event.name(),
            actor_id = ?event.actor_id,
            payload = %payload,
            "Domain event"
        );
        Ok(())
    }
}

/// Hands events to the configured notifier after the state change is durable.
#[derive(Clone)]
pub struct EventDispatcher {
    notifier: Arc<dyn EventNotifier>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher").finish_non_exhaustive()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher around a notifier.
    pub fn new(notifier: Arc<dyn EventNotifier>) -> Self {
        Self { notifier }
    }

    /// Deliver an event. Failures are logged and never propagated.
    pub async fn dispatch(&self, actor_id: Uuid, payload: impl Into<EventPayload>) {
        let event = DomainEvent::new(Some(actor_id), payload.into());
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(
                event_id = %event.id,
                event = event.name(),
                error = %e,
                "Event notification failed"
            );
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogNotifier))
    }
}
