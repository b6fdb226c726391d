// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and dashboard period boundaries.

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing `day`.
pub fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Lower bound of the `/weekly` view: the Monday `weeks - 1` weeks before
/// the current week, so exactly `weeks` calendar weeks are covered.
pub fn weekly_series_start(today: NaiveDate, weeks: i64) -> NaiveDate {
    week_start(today) - Duration::weeks((weeks - 1).max(0))
}

/// Lower bound of the `/monthly` view (rolling window of `days`).
pub fn monthly_series_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days)
}
