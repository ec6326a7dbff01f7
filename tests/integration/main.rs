//! HTTP integration tests against the in-memory store.

mod auth_test;
mod device_test;
mod helpers;
mod location_test;
mod request_test;
