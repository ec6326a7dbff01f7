//! Route statistics and per-day aggregation over history entries.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::history::LocationHistoryEntry;

/// Statistics over a chronologically ordered slice of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    /// Number of points.
    pub total_points: u64,
    /// Cumulative total of the last point in the slice.
    pub total_distance: f64,
    /// Time of the first point.
    pub start_time: Option<DateTime<Utc>>,
    /// Time of the last point.
    pub end_time: Option<DateTime<Utc>>,
    /// `end_time - start_time` in seconds.
    pub duration_seconds: i64,
}

impl RouteStats {
    /// Compute stats for entries sorted ascending by `recorded_at`.
    pub fn from_entries(entries: &[LocationHistoryEntry]) -> Self {
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return Self {
                total_points: 0,
                total_distance: 0.0,
                start_time: None,
                end_time: None,
                duration_seconds: 0,
            };
        };
        Self {
            total_points: entries.len() as u64,
            total_distance: last.total_distance,
            start_time: Some(first.recorded_at),
            end_time: Some(last.recorded_at),
            duration_seconds: (last.recorded_at - first.recorded_at).num_seconds(),
        }
    }
}

/// Summary of one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// The day.
    pub date: NaiveDate,
    /// Points recorded that day.
    pub point_count: u64,
    /// Largest cumulative total seen that day.
    pub total_distance: f64,
    /// Earliest point.
    pub start_time: DateTime<Utc>,
    /// Latest point.
    pub end_time: DateTime<Utc>,
}

/// Group entries by UTC day, newest day first.
pub fn summarize_by_day<'a, I>(entries: I) -> Vec<DailySummary>
where
    I: IntoIterator<Item = &'a LocationHistoryEntry>,
{
    let mut days: BTreeMap<NaiveDate, DailySummary> = BTreeMap::new();
    for entry in entries {
        let date = entry.recorded_at.date_naive();
        days.entry(date)
            .and_modify(|day| {
                day.point_count += 1;
                day.total_distance = day.total_distance.max(entry.total_distance);
                day.start_time = day.start_time.min(entry.recorded_at);
                day.end_time = day.end_time.max(entry.recorded_at);
            })
            .or_insert_with(|| DailySummary {
                date,
                point_count: 1,
                total_distance: entry.total_distance,
                start_time: entry.recorded_at,
                end_time: entry.recorded_at,
            });
    }
    days.into_values().rev().collect()
}
