//! Core traits defined in `geotrack-core` and implemented by other crates.

pub mod notifier;

pub use notifier::EventNotifier;
