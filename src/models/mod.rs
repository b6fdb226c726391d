// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod stats;
pub mod streak;

pub use activity::{Activity, ActivityMap};
pub use athlete::{Athlete, AthleteProfile, AthleteTokens};
pub use stats::{SeriesBucket, Totals};
pub use streak::{compute_streak, Streak, StreakStats};
