// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregates over the local activity mirror.
//!
//! All periods are keyed on `calculated_day` (the activity's local date),
//! and the caller supplies "today" so views stay deterministic in tests.

use crate::db::Database;
use crate::error::Result;
use crate::models::{SeriesBucket, StreakStats, Totals};
use crate::time_utils::{month_start, monthly_series_start, week_start, weekly_series_start};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Calendar weeks covered by the weekly series.
pub const WEEKLY_SERIES_WEEKS: i64 = 12;
/// Rolling window (days) covered by the monthly series.
pub const MONTHLY_SERIES_DAYS: i64 = 365;

/// Totals for the current day, week and month plus the stored streak.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardStats {
    pub today: Totals,
    pub this_week: Totals,
    pub this_month: Totals,
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub streak: StreakStats,
}

#[derive(Clone)]
pub struct StatsService {
    db: Database,
}

impl StatsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self, athlete_id: i64, today: NaiveDate) -> Result<DashboardStats> {
        let tomorrow = today + Duration::days(1);

        let today_totals = self.db.totals_between(athlete_id, today, tomorrow).await?;
        let week = self
            .db
            .totals_between(athlete_id, week_start(today), tomorrow)
            .await?;
        let month = self
            .db
            .totals_between(athlete_id, month_start(today), tomorrow)
            .await?;

        let streak = self
            .db
            .get_streak(athlete_id)
            .await?
            .map(|s| s.stats())
            .unwrap_or_default();

        Ok(DashboardStats {
            today: today_totals.into(),
            this_week: week.into(),
            this_month: month.into(),
            streak,
        })
    }

    /// Last 12 calendar weeks keyed by Monday, newest first. Empty weeks are omitted.
    pub async fn weekly(&self, athlete_id: i64, today: NaiveDate) -> Result<Vec<SeriesBucket>> {
        let since = weekly_series_start(today, WEEKLY_SERIES_WEEKS);
        let buckets = self
            .db
            .weekly_buckets(athlete_id, since, today + Duration::days(1))
            .await?;
        Ok(buckets.into_iter().map(SeriesBucket::from).collect())
    }

    /// Last 365 days keyed by "YYYY-MM", newest first.
    pub async fn monthly(&self, athlete_id: i64, today: NaiveDate) -> Result<Vec<SeriesBucket>> {
        let since = monthly_series_start(today, MONTHLY_SERIES_DAYS);
        let buckets = self
            .db
            .monthly_buckets(athlete_id, since, today + Duration::days(1))
            .await?;
        Ok(buckets.into_iter().map(SeriesBucket::from).collect())
    }
}
