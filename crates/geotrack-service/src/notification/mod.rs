//! Post-commit event dispatch.

pub mod dispatcher;

pub use dispatcher::{EventDispatcher, LogNotifier};
