//! Location ingestion and history query configuration.

use serde::{Deserialize, Serialize};

/// Limits for history queries and the online staleness window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Number of history points returned when the caller gives no limit.
    #[serde(default = "default_history_limit")]
    pub history_default_limit: u64,
    /// Upper bound on the number of history points in one response.
    #[serde(default = "default_history_max")]
    pub history_max_limit: u64,
    /// Upper bound on the number of points returned for a single day.
    #[serde(default = "default_day_max_points")]
    pub day_max_points: u64,
    /// A tracked device counts as online if it was seen within this many seconds.
    #[serde(default = "default_online_threshold")]
    pub online_threshold_seconds: i64,
    /// How far ahead of server time a report's `recorded_at` may be.
    #[serde(default = "default_max_clock_skew")]
    pub max_clock_skew_seconds: i64,
    /// Default number of raw records returned by the recent-records query.
    #[serde(default = "default_recent_records")]
    pub recent_records_limit: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_default_limit: default_history_limit(),
            history_max_limit: default_history_max(),
            day_max_points: default_day_max_points(),
            online_threshold_seconds: default_online_threshold(),
            max_clock_skew_seconds: default_max_clock_skew(),
            recent_records_limit: default_recent_records(),
        }
    }
}

fn default_history_limit() -> u64 {
    100
}

fn default_history_max() -> u64 {
    1000
}

fn default_day_max_points() -> u64 {
    10_000
}

fn default_online_threshold() -> i64 {
    300
}

fn default_max_clock_skew() -> i64 {
    300
}

fn default_recent_records() -> u64 {
    50
}
