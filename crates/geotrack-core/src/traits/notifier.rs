//! Outbound notification seam.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receives domain events after the state change that produced them is
/// durable.
///
/// A failing notifier never rolls back the originating operation; callers
/// log the error and move on.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventNotifier: Send + Sync + 'static {
    /// Deliver a single event.
    async fn notify(&self, event: &DomainEvent) -> AppResult<()>;
}
