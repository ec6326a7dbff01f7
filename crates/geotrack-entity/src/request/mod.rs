//! Device request domain entities.

pub mod line_item;
pub mod model;
pub mod status;

pub use line_item::{DeviceLineItem, NewLineItem};
pub use model::{DeviceRequest, NewDeviceRequest, NotificationKind, NotificationLogEntry};
pub use status::{LineItemStatus, RequestPriority, RequestStatus};
