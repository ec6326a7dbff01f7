//! Placement of a new report relative to the stored history.
//!
//! The "previous" point is the stored entry with the greatest
//! `recorded_at` at call time. A report later than it extends the path.
//! A report earlier than it (late arrival) is stored with zero distance
//! and the total of its chronological predecessor, so totals read in
//! `recorded_at` order never decrease and later points are never
//! rewritten. Route markers are the exception: a late report that becomes
//! the first or last point of its day bucket takes the marker over from
//! the neighbouring entry in that bucket.

use chrono::{DateTime, Utc};
use geotrack_core::types::{GeoPoint, round_meters};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::history::LocationHistoryEntry;
use super::record::LocationRecord;
use crate::device::DeviceCode;

/// Where a report lands in the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// No prior history for the device.
    First,
    /// Later than every stored entry.
    InOrder,
    /// Earlier than the latest stored entry.
    Late,
}

/// Distances and route markers computed for a new report.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedPoint {
    /// Where the report landed.
    pub placement: Placement,
    /// Meters from the previous point.
    pub distance_from_previous: f64,
    /// Cumulative meters.
    pub total_distance: f64,
    /// Day bucket of the report.
    pub route_id: String,
    /// Whether the report opens its bucket.
    pub is_route_start: bool,
    /// Whether the report closes its bucket.
    pub is_route_end: bool,
    /// Whether the latest stored entry must be flagged as a route end.
    pub closes_previous_route: bool,
    /// Whether the successor's route start flag must be cleared.
    pub takes_route_start: bool,
    /// Whether the predecessor's route end flag must be cleared.
    pub takes_route_end: bool,
}

/// Day bucket id for a device and timestamp (UTC calendar day).
pub fn route_id(device_id: &DeviceCode, recorded_at: DateTime<Utc>) -> String {
    format!("{device_id}:{}", recorded_at.format("%Y-%m-%d"))
}

impl SequencedPoint {
    /// Place a report.
    ///
    /// `latest` is the entry with the greatest `recorded_at`.
    /// `predecessor` and `successor` are the entries immediately before and
    /// after the report; they are only consulted for late reports.
    pub fn place(
        device_id: &DeviceCode,
        point: GeoPoint,
        recorded_at: DateTime<Utc>,
        latest: Option<&LocationHistoryEntry>,
        predecessor: Option<&LocationHistoryEntry>,
        successor: Option<&LocationHistoryEntry>,
    ) -> Self {
        let route = route_id(device_id, recorded_at);

        match latest {
            None => Self {
                placement: Placement::First,
                distance_from_previous: 0.0,
                total_distance: 0.0,
                route_id: route,
                is_route_start: true,
                is_route_end: false,
                closes_previous_route: false,
                takes_route_start: false,
                takes_route_end: false,
            },
            Some(previous) if recorded_at > previous.recorded_at => {
                let distance = round_meters(previous.point().haversine_distance(&point));
                let opens_bucket = previous.route_id != route;
                Self {
                    placement: Placement::InOrder,
                    distance_from_previous: distance,
                    total_distance: round_meters(previous.total_distance + distance),
                    route_id: route,
                    is_route_start: opens_bucket,
                    is_route_end: false,
                    closes_previous_route: opens_bucket,
                    takes_route_start: false,
                    takes_route_end: false,
                }
            }
            Some(_) => {
                let same_bucket = |e: &LocationHistoryEntry| e.route_id == route;
                let is_route_start = !predecessor.is_some_and(same_bucket);
                // A late report always has a successor; a different bucket there is already closed.
                let is_route_end = successor.is_some_and(|e| !same_bucket(e));
                Self {
                    placement: Placement::Late,
                    distance_from_previous: 0.0,
                    total_distance: predecessor.map_or(0.0, |p| p.total_distance),
                    is_route_start,
                    is_route_end,
                    closes_previous_route: false,
                    takes_route_start: is_route_start && successor.is_some_and(same_bucket),
                    takes_route_end: is_route_end && predecessor.is_some_and(same_bucket),
                    route_id: route,
                }
            }
        }
    }

    /// Late reports never move the cached last-known location.
    pub fn updates_last_known_location(&self) -> bool {
        self.placement != Placement::Late
    }

    /// Materialize the history entry for a stored record.
    pub fn into_entry(self, record: &LocationRecord, device_name: &str) -> LocationHistoryEntry {
        LocationHistoryEntry {
            id: Uuid::new_v4(),
            device_id: record.device_id.clone(),
            device_name: device_name.to_string(),
            record_id: record.id,
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy: record.accuracy,
            speed: record.speed,
            heading: record.heading,
            altitude: record.altitude,
            address: record.address.clone(),
            recorded_at: record.recorded_at,
            distance_from_previous: self.distance_from_previous,
            total_distance: self.total_distance,
            route_id: self.route_id,
            is_route_start: self.is_route_start,
            is_route_end: self.is_route_end,
        }
    }
}
