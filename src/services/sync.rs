// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity synchronization.
//!
//! Handles the core workflow:
//! 1. Pick the incremental starting point from the newest stored activity
//! 2. Page through Strava's activity list until a short page
//! 3. Upsert each page in a single transaction
//! 4. Recompute the athlete's streak

use crate::db::Database;
use crate::error::Result;
use crate::models::{compute_streak, StreakStats};
use crate::services::StravaService;
use chrono::{Duration, NaiveDate, Utc};

/// Activities requested per page; a shorter page is the last one.
pub const PAGE_SIZE: u32 = 50;

/// Result of syncing one athlete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub pages: u32,
    pub activities_seen: u32,
    pub new_activities: u32,
    pub streak: StreakStats,
}

/// Result of a map backfill for one athlete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSyncReport {
    pub pages: u32,
    pub updated: u32,
}

/// Per-athlete outcome of a batch run.
#[derive(Debug)]
pub struct AthleteOutcome<T> {
    pub athlete_id: i64,
    pub result: Result<T>,
}

/// Mirrors Strava activities into the local store.
#[derive(Clone)]
pub struct SyncService {
    strava: StravaService,
    db: Database,
}

impl SyncService {
    pub fn new(strava: StravaService, db: Database) -> Self {
        Self { strava, db }
    }

    /// Pull new and changed activities for one athlete, then refresh the streak.
    ///
    /// Starts one day before the newest stored `start_date` so late edits
    /// near the boundary are picked up. A failed page aborts the run; pages
    /// already stored stay stored.
    pub async fn sync_athlete(&self, athlete_id: i64) -> Result<SyncReport> {
        let after = self
            .db
            .latest_start_date(athlete_id)
            .await?
            .map(|latest| (latest - Duration::days(1)).timestamp())
            .unwrap_or(0);

        tracing::info!(athlete_id, after, "Starting activity sync");

        let mut report = SyncReport::default();
        let mut page = 1u32;

        loop {
            let summaries = self
                .strava
                .list_activities(athlete_id, Some(after), page, PAGE_SIZE)
                .await?;

            if summaries.is_empty() {
                break;
            }

            let fetched = summaries.len() as u32;
            let now = Utc::now();
            let activities: Vec<_> = summaries
                .into_iter()
                .map(|s| s.into_activity(athlete_id, now))
                .collect();

            let inserted = self.db.upsert_activities(&activities).await?;

            report.pages += 1;
            report.activities_seen += fetched;
            report.new_activities += inserted;

            tracing::debug!(athlete_id, page, fetched, inserted, "Stored activity page");

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        report.streak = self
            .recompute_streak(athlete_id, chrono::Local::now().date_naive())
            .await?;

        tracing::info!(
            athlete_id,
            pages = report.pages,
            seen = report.activities_seen,
            new = report.new_activities,
            current_streak = report.streak.current_streak,
            "Activity sync complete"
        );

        Ok(report)
    }

    /// Recompute and store the streak as of `today`.
    pub async fn recompute_streak(&self, athlete_id: i64, today: NaiveDate) -> Result<StreakStats> {
        let days = self.db.activity_days(athlete_id).await?;
        let stats = compute_streak(&days, today);
        self.db.set_streak(athlete_id, &stats).await?;
        Ok(stats)
    }

    /// Sync every stored athlete. Failures are logged and do not stop the batch.
    pub async fn sync_all(&self) -> Result<Vec<AthleteOutcome<SyncReport>>> {
        let athletes = self.db.list_athletes().await?;
        if athletes.is_empty() {
            tracing::warn!("No athletes found, nothing to sync");
        }

        let mut outcomes = Vec::with_capacity(athletes.len());
        for athlete in athletes {
            let result = self.sync_athlete(athlete.id).await;
            if let Err(e) = &result {
                tracing::error!(
                    athlete_id = athlete.id,
                    name = %athlete.display_name(),
                    error = %e,
                    "Sync failed, skipping athlete"
                );
            }
            outcomes.push(AthleteOutcome {
                athlete_id: athlete.id,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Re-read the full activity list and store map data for activities that
    /// already exist locally. Unknown activities are skipped.
    pub async fn sync_maps(&self, athlete_id: i64) -> Result<MapSyncReport> {
        let mut report = MapSyncReport::default();
        let mut page = 1u32;

        loop {
            let summaries = self
                .strava
                .list_activities(athlete_id, None, page, PAGE_SIZE)
                .await?;

            if summaries.is_empty() {
                break;
            }

            let fetched = summaries.len() as u32;
            for summary in &summaries {
                if self
                    .db
                    .update_activity_map(athlete_id, summary.id, &summary.map_fields())
                    .await?
                {
                    report.updated += 1;
                }
            }

            report.pages += 1;
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::info!(athlete_id, updated = report.updated, "Map sync complete");
        Ok(report)
    }

    /// Map backfill for every stored athlete.
    pub async fn sync_maps_all(&self) -> Result<Vec<AthleteOutcome<MapSyncReport>>> {
        let athletes = self.db.list_athletes().await?;
        let mut outcomes = Vec::with_capacity(athletes.len());

        for athlete in athletes {
            let result = self.sync_maps(athlete.id).await;
            if let Err(e) = &result {
                tracing::error!(athlete_id = athlete.id, error = %e, "Map sync failed");
            }
            outcomes.push(AthleteOutcome {
                athlete_id: athlete.id,
                result,
            });
        }

        Ok(outcomes)
    }
}
