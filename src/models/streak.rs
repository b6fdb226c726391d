// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity streaks: consecutive calendar days with at least one activity.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Streak counters derived from an athlete's distinct activity days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Length of the run ending today or yesterday, else 0
    pub current_streak: i64,
    /// Longest run of consecutive days ever
    pub longest_streak: i64,
    /// Number of distinct active days
    pub total_days: i64,
    /// Most recent active day
    pub last_activity_date: Option<NaiveDate>,
}

/// Stored streak row (one per athlete).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Streak {
    pub athlete_id: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_days: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl Streak {
    pub fn stats(&self) -> StreakStats {
        StreakStats {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            total_days: self.total_days,
            last_activity_date: self.last_activity_date,
        }
    }
}

/// Compute streaks from distinct active days sorted ascending.
///
/// Single pass: the running counter grows when a day directly follows the
/// previous one and restarts at 1 on any gap. The final run only counts as
/// current when `today` or the day before is an active day.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> StreakStats {
    let mut running = 0i64;
    let mut longest = 0i64;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        running = match previous {
            Some(prev) if day - prev == Duration::days(1) => running + 1,
            Some(prev) if day == prev => running,
            _ => 1,
        };
        longest = longest.max(running);
        previous = Some(day);
    }

    // The final run counts only when today or yesterday is an active day,
    // even if later-dated entries extend or replace that run.
    let yesterday = today - Duration::days(1);
    let current = if days.binary_search(&today).is_ok() || days.binary_search(&yesterday).is_ok() {
        running
    } else {
        0
    };

    StreakStats {
        current_streak: current,
        longest_streak: longest,
        total_days: days.len() as i64,
        last_activity_date: previous,
    }
}
