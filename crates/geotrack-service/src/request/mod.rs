//! Device request workflow.

pub mod service;

pub use service::{ApprovalOutcome, RequestService, SubmitRequest};
