// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model for storage and API.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored activity record, mirrored field-for-field from the Strava listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Strava activity ID (primary key, dedup key)
    pub id: i64,
    /// Strava athlete ID (owner)
    pub athlete_id: i64,
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: i64,
    /// Elapsed time in seconds
    pub elapsed_time: i64,
    /// Elevation gain in meters
    pub total_elevation_gain: f64,
    /// Legacy activity type (Run, Ride, Swim, ...)
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Sport type (Run, TrailRun, GravelRide, ...)
    pub sport_type: Option<String>,
    /// Start time in UTC
    pub start_date: DateTime<Utc>,
    /// Start time in the athlete's local time zone (wall clock)
    pub start_date_local: NaiveDateTime,
    /// Date part of `start_date_local`; used for day/week/month grouping
    pub calculated_day: NaiveDate,
    pub timezone: Option<String>,
    pub utc_offset: Option<i64>,
    pub achievement_count: Option<i64>,
    pub kudos_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub athlete_count: Option<i64>,
    pub photo_count: Option<i64>,
    pub total_photo_count: Option<i64>,
    pub trainer: Option<bool>,
    pub commute: Option<bool>,
    pub manual: Option<bool>,
    pub private: Option<bool>,
    pub flagged: Option<bool>,
    /// Average speed in m/s
    pub average_speed: Option<f64>,
    /// Max speed in m/s
    pub max_speed: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_temp: Option<f64>,
    pub average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub weighted_average_watts: Option<f64>,
    pub kilojoules: Option<f64>,
    pub device_watts: Option<bool>,
    pub has_heartrate: Option<bool>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub elev_high: Option<f64>,
    pub elev_low: Option<f64>,
    pub upload_id: Option<i64>,
    pub upload_id_str: Option<String>,
    pub external_id: Option<String>,
    pub from_accepted_tag: Option<bool>,
    pub pr_count: Option<i64>,
    pub has_kudoed: Option<bool>,
    pub workout_type: Option<i64>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub gear_id: Option<String>,
    /// Encoded summary polyline (filled by the map sync)
    pub summary_polyline: Option<String>,
    /// `[lat, lng]` as JSON text
    pub start_latlng: Option<String>,
    /// `[lat, lng]` as JSON text
    pub end_latlng: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Distance in kilometers.
    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }

    /// Average speed in km/h (0 when unknown).
    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed.map(|s| s * 3.6).unwrap_or(0.0)
    }

    /// Pace as "MM:SS" per kilometer, or `None` without distance or time.
    pub fn pace_per_km(&self) -> Option<String> {
        if self.distance <= 0.0 || self.moving_time <= 0 {
            return None;
        }
        let secs_per_km = self.moving_time as f64 / self.distance * 1000.0;
        let minutes = (secs_per_km / 60.0).floor() as i64;
        let seconds = (secs_per_km % 60.0).floor() as i64;
        Some(format!("{:02}:{:02}", minutes, seconds))
    }

    /// Compact moving time: "1h 5m", "12m 30s" or "45s".
    pub fn moving_time_formatted(&self) -> String {
        format_duration(self.moving_time)
    }
}

/// Format a number of seconds the way activity lists show it.
pub fn format_duration(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Map fields written by the map backfill job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityMap {
    pub summary_polyline: Option<String>,
    pub start_latlng: Option<String>,
    pub end_latlng: Option<String>,
}
