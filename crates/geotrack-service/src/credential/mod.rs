//! QR credential issue, validation and scanning.

pub mod service;

pub use service::{CredentialService, CredentialView, ScanSnapshot, resolve_validity_days};
