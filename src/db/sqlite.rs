// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Athletes (profile + OAuth credentials)
//! - Activities (mirrored Strava activities)
//! - Streaks (per-athlete counters)
//! - Aggregates (period totals and weekly/monthly series)

use crate::db::schema::CURRENT_SCHEMA;
use crate::error::AppError;
use crate::models::stats::{RawBucket, RawTotals};
use crate::models::{Activity, ActivityMap, Athlete, AthleteProfile, AthleteTokens, Streak, StreakStats};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Columns written on activity insert, in bind order.
const ACTIVITY_COLUMNS: &str = "id, athlete_id, name, distance, moving_time, elapsed_time, \
    total_elevation_gain, type, sport_type, start_date, start_date_local, calculated_day, \
    timezone, utc_offset, achievement_count, kudos_count, comment_count, athlete_count, \
    photo_count, total_photo_count, trainer, commute, manual, private, flagged, \
    average_speed, max_speed, average_cadence, average_temp, average_watts, max_watts, \
    weighted_average_watts, kilojoules, device_watts, has_heartrate, average_heartrate, \
    max_heartrate, elev_high, elev_low, upload_id, upload_id_str, external_id, \
    from_accepted_tag, pr_count, has_kudoed, workout_type, description, calories, gear_id, \
    summary_polyline, start_latlng, end_latlng, created_at, updated_at";

const ACTIVITY_PLACEHOLDERS: &str = "?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
    ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
    ?, ?, ?, ?, ?, ?";

/// Fields refreshed when an already-mirrored activity shows up again.
/// The owner and `created_at` never change; detail-only and map fields are
/// kept when the listing omits them.
const ACTIVITY_UPSERT_SET: &str = "name = excluded.name, \
    distance = excluded.distance, moving_time = excluded.moving_time, \
    elapsed_time = excluded.elapsed_time, total_elevation_gain = excluded.total_elevation_gain, \
    type = excluded.type, sport_type = excluded.sport_type, start_date = excluded.start_date, \
    start_date_local = excluded.start_date_local, calculated_day = excluded.calculated_day, \
    timezone = excluded.timezone, utc_offset = excluded.utc_offset, \
    achievement_count = excluded.achievement_count, kudos_count = excluded.kudos_count, \
    comment_count = excluded.comment_count, athlete_count = excluded.athlete_count, \
    photo_count = excluded.photo_count, total_photo_count = excluded.total_photo_count, \
    trainer = excluded.trainer, commute = excluded.commute, manual = excluded.manual, \
    private = excluded.private, flagged = excluded.flagged, \
    average_speed = excluded.average_speed, max_speed = excluded.max_speed, \
    average_cadence = excluded.average_cadence, average_temp = excluded.average_temp, \
    average_watts = excluded.average_watts, max_watts = excluded.max_watts, \
    weighted_average_watts = excluded.weighted_average_watts, kilojoules = excluded.kilojoules, \
    device_watts = excluded.device_watts, has_heartrate = excluded.has_heartrate, \
    average_heartrate = excluded.average_heartrate, max_heartrate = excluded.max_heartrate, \
    elev_high = excluded.elev_high, elev_low = excluded.elev_low, \
    upload_id = excluded.upload_id, upload_id_str = excluded.upload_id_str, \
    external_id = excluded.external_id, from_accepted_tag = excluded.from_accepted_tag, \
    pr_count = excluded.pr_count, has_kudoed = excluded.has_kudoed, \
    workout_type = excluded.workout_type, \
    description = COALESCE(excluded.description, activities.description), \
    calories = COALESCE(excluded.calories, activities.calories), \
    gear_id = excluded.gear_id, \
    summary_polyline = COALESCE(excluded.summary_polyline, activities.summary_polyline), \
    start_latlng = COALESCE(excluded.start_latlng, activities.start_latlng), \
    end_latlng = COALESCE(excluded.end_latlng, activities.end_latlng), \
    updated_at = excluded.updated_at";

/// Aggregate expressions shared by the totals and series queries.
const TOTALS_SELECT: &str = "COUNT(*) AS count, \
    TOTAL(distance) AS distance_m, \
    TOTAL(total_elevation_gain) AS elevation_m, \
    COALESCE(SUM(moving_time), 0) AS moving_time_s";

/// Optional filters for activity listings.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Case-insensitive match on the activity type
    pub activity_type: Option<String>,
}

/// SQLite database client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to a SQLite database and apply the schema.
    ///
    /// `sqlite::memory:` gets a single long-lived connection so every query
    /// sees the same in-memory database.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
        }
        .map_err(|e| AppError::Database(format!("Failed to open SQLite database: {}", e)))?;

        let db = Self { pool };
        db.apply_schema().await?;

        tracing::info!(url = database_url, "Connected to SQLite");
        Ok(db)
    }

    /// Create a fresh in-memory database (tests, one-off tooling).
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:").await
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(CURRENT_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    // ─── Athlete Operations ──────────────────────────────────────

    /// Get an athlete by Strava athlete ID.
    pub async fn get_athlete(&self, athlete_id: i64) -> Result<Option<Athlete>, AppError> {
        let athlete = sqlx::query_as::<_, Athlete>("SELECT * FROM athletes WHERE id = ?")
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(athlete)
    }

    /// All athletes, oldest first (scheduled sync order).
    pub async fn list_athletes(&self) -> Result<Vec<Athlete>, AppError> {
        let athletes =
            sqlx::query_as::<_, Athlete>("SELECT * FROM athletes ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(athletes)
    }

    /// Create or update an athlete with fresh profile fields and tokens.
    pub async fn upsert_athlete(
        &self,
        profile: &AthleteProfile,
        tokens: &AthleteTokens,
    ) -> Result<Athlete, AppError> {
        let now = Utc::now();
        let athlete = sqlx::query_as::<_, Athlete>(
            "INSERT INTO athletes (id, username, firstname, lastname, profile_medium, profile, \
                 city, state, country, sex, access_token, refresh_token, expires_at, \
                 created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 username = excluded.username, firstname = excluded.firstname, \
                 lastname = excluded.lastname, profile_medium = excluded.profile_medium, \
                 profile = excluded.profile, city = excluded.city, state = excluded.state, \
                 country = excluded.country, sex = excluded.sex, \
                 access_token = excluded.access_token, refresh_token = excluded.refresh_token, \
                 expires_at = excluded.expires_at, updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .bind(&profile.profile_medium)
        .bind(&profile.profile)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.country)
        .bind(&profile.sex)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(athlete)
    }

    /// Store refreshed OAuth tokens. Returns false if the athlete is gone.
    pub async fn update_tokens(
        &self,
        athlete_id: i64,
        tokens: &AthleteTokens,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE athletes \
             SET access_token = ?, refresh_token = ?, expires_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(Utc::now())
        .bind(athlete_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by Strava ID.
    pub async fn get_activity(&self, activity_id: i64) -> Result<Option<Activity>, AppError> {
        let activity = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = ?")
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(activity)
    }

    /// Upsert a page of activities in one transaction.
    ///
    /// Rows are keyed by Strava ID: unknown IDs are inserted, known IDs owned
    /// by the same athlete get their copied fields refreshed. Returns the
    /// number of newly inserted rows.
    pub async fn upsert_activities(&self, activities: &[Activity]) -> Result<u32, AppError> {
        let sql = format!(
            "INSERT INTO activities ({}) VALUES ({}) \
             ON CONFLICT(id) DO UPDATE SET {} \
             WHERE activities.athlete_id = excluded.athlete_id",
            ACTIVITY_COLUMNS, ACTIVITY_PLACEHOLDERS, ACTIVITY_UPSERT_SET
        );

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u32;

        for a in activities {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM activities WHERE id = ?")
                .bind(a.id)
                .fetch_optional(&mut *tx)
                .await?;

            sqlx::query(&sql)
                .bind(a.id)
                .bind(a.athlete_id)
                .bind(&a.name)
                .bind(a.distance)
                .bind(a.moving_time)
                .bind(a.elapsed_time)
                .bind(a.total_elevation_gain)
                .bind(&a.activity_type)
                .bind(&a.sport_type)
                .bind(a.start_date)
                .bind(a.start_date_local)
                .bind(a.calculated_day)
                .bind(&a.timezone)
                .bind(a.utc_offset)
                .bind(a.achievement_count)
                .bind(a.kudos_count)
                .bind(a.comment_count)
                .bind(a.athlete_count)
                .bind(a.photo_count)
                .bind(a.total_photo_count)
                .bind(a.trainer)
                .bind(a.commute)
                .bind(a.manual)
                .bind(a.private)
                .bind(a.flagged)
                .bind(a.average_speed)
                .bind(a.max_speed)
                .bind(a.average_cadence)
                .bind(a.average_temp)
                .bind(a.average_watts)
                .bind(a.max_watts)
                .bind(a.weighted_average_watts)
                .bind(a.kilojoules)
                .bind(a.device_watts)
                .bind(a.has_heartrate)
                .bind(a.average_heartrate)
                .bind(a.max_heartrate)
                .bind(a.elev_high)
                .bind(a.elev_low)
                .bind(a.upload_id)
                .bind(&a.upload_id_str)
                .bind(&a.external_id)
                .bind(a.from_accepted_tag)
                .bind(a.pr_count)
                .bind(a.has_kudoed)
                .bind(a.workout_type)
                .bind(&a.description)
                .bind(a.calories)
                .bind(&a.gear_id)
                .bind(&a.summary_polyline)
                .bind(&a.start_latlng)
                .bind(&a.end_latlng)
                .bind(a.created_at)
                .bind(a.updated_at)
                .execute(&mut *tx)
                .await?;

            if exists.is_none() {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Most recent `start_date` stored for an athlete.
    pub async fn latest_start_date(
        &self,
        athlete_id: i64,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT start_date FROM activities WHERE athlete_id = ? \
             ORDER BY start_date DESC LIMIT 1",
        )
        .bind(athlete_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(latest)
    }

    /// Store map data for an activity owned by `athlete_id`.
    /// Returns false when no such activity exists locally.
    pub async fn update_activity_map(
        &self,
        athlete_id: i64,
        activity_id: i64,
        map: &ActivityMap,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE activities \
             SET summary_polyline = ?, start_latlng = ?, end_latlng = ?, updated_at = ? \
             WHERE id = ? AND athlete_id = ?",
        )
        .bind(&map.summary_polyline)
        .bind(&map.start_latlng)
        .bind(&map.end_latlng)
        .bind(Utc::now())
        .bind(activity_id)
        .bind(athlete_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Activities for an athlete, newest first.
    pub async fn list_activities(
        &self,
        athlete_id: i64,
        filter: &ActivityFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Activity>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities \
             WHERE athlete_id = ?1 AND (?2 IS NULL OR lower(type) = lower(?2)) \
             ORDER BY start_date DESC, id DESC \
             LIMIT ?3 OFFSET ?4",
        )
        .bind(athlete_id)
        .bind(filter.activity_type.as_deref())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    /// Number of activities matching the listing filter.
    pub async fn count_activities(
        &self,
        athlete_id: i64,
        filter: &ActivityFilter,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activities \
             WHERE athlete_id = ?1 AND (?2 IS NULL OR lower(type) = lower(?2))",
        )
        .bind(athlete_id)
        .bind(filter.activity_type.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Distinct activity types recorded by an athlete, alphabetical.
    pub async fn activity_types(&self, athlete_id: i64) -> Result<Vec<String>, AppError> {
        let types: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT type FROM activities WHERE athlete_id = ? ORDER BY type",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    /// Same-type activities by the same athlete whose local start falls on
    /// the same month and day (any year), excluding the activity itself.
    pub async fn similar_activities(&self, activity: &Activity) -> Result<Vec<Activity>, AppError> {
        let month_day = activity.calculated_day.format("%m-%d").to_string();
        let similar = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities \
             WHERE athlete_id = ? AND type = ? AND substr(calculated_day, 6, 5) = ? AND id != ? \
             ORDER BY start_date DESC",
        )
        .bind(activity.athlete_id)
        .bind(&activity.activity_type)
        .bind(month_day)
        .bind(activity.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(similar)
    }

    /// Distinct local activity days for an athlete, ascending.
    pub async fn activity_days(&self, athlete_id: i64) -> Result<Vec<NaiveDate>, AppError> {
        let days: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT DISTINCT calculated_day FROM activities \
             WHERE athlete_id = ? ORDER BY calculated_day",
        )
        .bind(athlete_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(days)
    }

    // ─── Streak Operations ───────────────────────────────────────

    /// Get the stored streak for an athlete.
    pub async fn get_streak(&self, athlete_id: i64) -> Result<Option<Streak>, AppError> {
        let streak = sqlx::query_as::<_, Streak>("SELECT * FROM streaks WHERE athlete_id = ?")
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(streak)
    }

    /// Create or replace the streak row for an athlete.
    pub async fn set_streak(&self, athlete_id: i64, stats: &StreakStats) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO streaks (athlete_id, current_streak, longest_streak, total_days, \
                 last_activity_date, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(athlete_id) DO UPDATE SET \
                 current_streak = excluded.current_streak, \
                 longest_streak = excluded.longest_streak, \
                 total_days = excluded.total_days, \
                 last_activity_date = excluded.last_activity_date, \
                 updated_at = excluded.updated_at",
        )
        .bind(athlete_id)
        .bind(stats.current_streak)
        .bind(stats.longest_streak)
        .bind(stats.total_days)
        .bind(stats.last_activity_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ─── Aggregates ──────────────────────────────────────────────

    /// Totals for activities with `from <= calculated_day < until`.
    pub async fn totals_between(
        &self,
        athlete_id: i64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<RawTotals, AppError> {
        let sql = format!(
            "SELECT {} FROM activities \
             WHERE athlete_id = ? AND calculated_day >= ? AND calculated_day < ?",
            TOTALS_SELECT
        );
        let totals = sqlx::query_as::<_, RawTotals>(&sql)
            .bind(athlete_id)
            .bind(from)
            .bind(until)
            .fetch_one(&self.pool)
            .await?;
        Ok(totals)
    }

    /// Totals grouped by week (Monday start) for days in `[since, until)`,
    /// newest first.
    pub async fn weekly_buckets(
        &self,
        athlete_id: i64,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<RawBucket>, AppError> {
        // 'weekday 0' moves forward to Sunday; six days back is that week's Monday.
        self.grouped_buckets(
            athlete_id,
            since,
            until,
            "date(calculated_day, 'weekday 0', '-6 days')",
        )
        .await
    }

    /// Totals grouped by calendar month ("YYYY-MM") for days in
    /// `[since, until)`, newest first.
    pub async fn monthly_buckets(
        &self,
        athlete_id: i64,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<RawBucket>, AppError> {
        self.grouped_buckets(athlete_id, since, until, "substr(calculated_day, 1, 7)")
            .await
    }

    async fn grouped_buckets(
        &self,
        athlete_id: i64,
        since: NaiveDate,
        until: NaiveDate,
        period_expr: &str,
    ) -> Result<Vec<RawBucket>, AppError> {
        let sql = format!(
            "SELECT {} AS period, {} FROM activities \
             WHERE athlete_id = ? AND calculated_day >= ? AND calculated_day < ? \
             GROUP BY period ORDER BY period DESC",
            period_expr, TOTALS_SELECT
        );
        let buckets = sqlx::query_as::<_, RawBucket>(&sql)
            .bind(athlete_id)
            .bind(since)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;
        Ok(buckets)
    }
}
