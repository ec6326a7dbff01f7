//! # geotrack-database
//!
//! Store traits for devices, requests and location history, with a
//! PostgreSQL implementation and an in-memory implementation for tests
//! and single-node demos.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{
    AppendOutcome, DeviceStore, HistoryWindow, LineItemApproval, LineItemRejection, LocationStore,
    RequestFilter, RequestStore,
};
