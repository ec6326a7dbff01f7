//! Location reports and the derived history series.

pub mod alert;
pub mod history;
pub mod record;
pub mod sequence;
pub mod summary;

pub use alert::{AlertSeverity, LocationAlert, NewLocationAlert};
pub use history::LocationHistoryEntry;
pub use record::{LocationRecord, LocationSource, NewLocationRecord};
pub use sequence::{Placement, SequencedPoint, route_id};
pub use summary::{DailySummary, RouteStats, summarize_by_day};
