//! Aggregate shapes returned by the dashboard queries.
//!
//! Raw sums come straight out of SQLite in storage units (meters, seconds);
//! `Totals` converts them into the units the dashboard shows.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Raw row produced by a SUM/COUNT query.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct RawTotals {
    pub count: i64,
    pub distance_m: f64,
    pub elevation_m: f64,
    pub moving_time_s: i64,
}

/// Raw grouped row: one period key plus its sums.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawBucket {
    pub period: String,
    pub count: i64,
    pub distance_m: f64,
    pub elevation_m: f64,
    pub moving_time_s: i64,
}

/// Totals for a period in display units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Totals {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: i64,
    /// Kilometers
    pub distance: f64,
    /// Meters
    pub elevation: f64,
    /// Hours
    pub time: f64,
}

impl From<RawTotals> for Totals {
    fn from(raw: RawTotals) -> Self {
        Self {
            count: raw.count,
            distance: raw.distance_m / 1000.0,
            elevation: raw.elevation_m,
            time: raw.moving_time_s as f64 / 3600.0,
        }
    }
}

/// One entry of a weekly or monthly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SeriesBucket {
    /// "YYYY-MM-DD" (week start, Monday) or "YYYY-MM"
    pub period: String,
    pub data: Totals,
}

impl From<RawBucket> for SeriesBucket {
    fn from(raw: RawBucket) -> Self {
        Self {
            period: raw.period,
            data: Totals::from(RawTotals {
                count: raw.count,
                distance_m: raw.distance_m,
                elevation_m: raw.elevation_m,
                moving_time_s: raw.moving_time_s,
            }),
        }
    }
}
