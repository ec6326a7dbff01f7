//! # geotrack-service
//!
//! Business logic service layer for GeoTrack. Each service orchestrates
//! the store traits to implement one group of use cases and enforces the
//! role and ownership rules for the acting user.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod credential;
pub mod device;
pub mod location;
pub mod notification;
pub mod request;

pub use context::RequestContext;
pub use credential::CredentialService;
pub use device::DeviceService;
pub use location::{HistoryService, IngestionService};
pub use notification::{EventDispatcher, LogNotifier};
pub use request::RequestService;

#[cfg(test)]
pub(crate) mod test_support;
