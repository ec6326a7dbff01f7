//! Route handlers organized by domain.

pub mod credential;
pub mod device;
pub mod health;
pub mod history;
pub mod location;
pub mod request;
