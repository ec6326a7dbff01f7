//! Location ingestion and history queries.

pub mod history;
pub mod ingest;

pub use history::{DayHistory, HistoryQuery, HistoryResult, HistoryService};
pub use ingest::{IngestOutcome, IngestionService, LocationReport};
