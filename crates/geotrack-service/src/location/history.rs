//! Read-only queries over ingested history.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use geotrack_core::config::TrackingConfig;
use geotrack_core::error::AppError;
use geotrack_core::result::AppResult;
use geotrack_database::{DeviceStore, HistoryWindow, LocationStore};
use geotrack_entity::device::{Device, DeviceCode};
use geotrack_entity::location::{DailySummary, LocationHistoryEntry, RouteStats};

use crate::context::RequestContext;

/// Range and size of a history query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Inclusive lower bound.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end_date: Option<DateTime<Utc>>,
    /// Maximum number of points.
    pub limit: Option<u64>,
}

/// Entries in a range plus route statistics.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResult {
    /// Device id.
    pub device_id: DeviceCode,
    /// Entries ascending by `recorded_at`.
    pub entries: Vec<LocationHistoryEntry>,
    /// Statistics over `entries`.
    pub route_info: RouteStats,
}

/// One UTC day of history.
#[derive(Debug, Clone, Serialize)]
pub struct DayHistory {
    /// Device id.
    pub device_id: DeviceCode,
    /// The day.
    pub date: NaiveDate,
    /// Entries ascending by `recorded_at`.
    pub entries: Vec<LocationHistoryEntry>,
    /// Statistics over `entries`.
    pub route_stats: RouteStats,
}

/// Path and history query service.
#[derive(Clone)]
pub struct HistoryService {
    devices: Arc<dyn DeviceStore>,
    locations: Arc<dyn LocationStore>,
    config: TrackingConfig,
}

impl std::fmt::Debug for HistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HistoryService {
    /// Creates a new history service.
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        locations: Arc<dyn LocationStore>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            devices,
            locations,
            config,
        }
    }

    /// Entries within `[start_date, end_date]`, most recent `limit` of them,
    /// in ascending order.
    pub async fn get_history(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        query: HistoryQuery,
    ) -> AppResult<HistoryResult> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date)
            && start > end
        {
            return Err(AppError::validation("startDate must not be after endDate"));
        }
        let limit = self.resolve_limit(query.limit)?;
        self.authorize(ctx, code).await?;

        let entries = self
            .locations
            .history(
                code,
                &HistoryWindow {
                    start: query.start_date,
                    end: query.end_date,
                    end_inclusive: true,
                    limit,
                },
            )
            .await?;
        let route_info = RouteStats::from_entries(&entries);
        debug!(device_id = %code, points = entries.len(), limit, "History queried");

        Ok(HistoryResult {
            device_id: code.clone(),
            entries,
            route_info,
        })
    }

    /// Per-day summaries, newest day first.
    pub async fn available_dates(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
    ) -> AppResult<Vec<DailySummary>> {
        self.authorize(ctx, code).await?;
        self.locations.daily_summaries(code).await
    }

    /// Entries recorded on `date` (UTC). A day without data is empty, not an error.
    pub async fn history_for_date(
        &self,
        ctx: &RequestContext,
        code: &DeviceCode,
        date: NaiveDate,
    ) -> AppResult<DayHistory> {
        self.authorize(ctx, code).await?;

        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = start
            .checked_add_signed(TimeDelta::days(1))
            .ok_or_else(|| AppError::validation(format!("Date {date} is out of range")))?;
        let entries = self
            .locations
            .history(
                code,
                &HistoryWindow {
                    start: Some(start),
                    end: Some(end),
                    end_inclusive: false,
                    limit: self.config.day_max_points,
                },
            )
            .await?;
        let route_stats = RouteStats::from_entries(&entries);
        debug!(device_id = %code, %date, points = entries.len(), "Day history queried");

        Ok(DayHistory {
            device_id: code.clone(),
            date,
            entries,
            route_stats,
        })
    }

    fn resolve_limit(&self, requested: Option<u64>) -> AppResult<u64> {
        match requested {
            Some(0) => Err(AppError::validation("limit must be at least 1")),
            Some(n) => Ok(n.min(self.config.history_max_limit)),
            None => Ok(self.config.history_default_limit),
        }
    }

    async fn authorize(&self, ctx: &RequestContext, code: &DeviceCode) -> AppResult<Device> {
        let device = self
            .devices
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Device {code} not found")))?;
        ctx.require_device_access(&device)?;
        Ok(device)
    }
}
