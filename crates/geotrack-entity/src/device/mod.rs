//! Device domain entities.

pub mod code;
pub mod credential;
pub mod model;
pub mod status;

pub use code::DeviceCode;
pub use credential::{QrCredential, QrPayload};
pub use model::{Device, LastKnownLocation, NewDevice};
pub use status::{DeviceStatus, TrackingState};
