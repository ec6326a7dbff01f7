//! Device directory operations.

pub mod service;

pub use service::{CurrentLocation, DeviceService, DeviceView, Telemetry};
