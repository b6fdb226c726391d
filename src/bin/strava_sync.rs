// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled sync job, meant to run from cron.
//!
//! `strava-sync` pulls new activities for every athlete.
//! `strava-sync maps` backfills route polylines for stored activities.

use strava_dashboard::{config::Config, db::Database, logging::init_logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let mode = std::env::args().nth(1);
    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url).await?;
    let state = AppState::new(config, db);

    match mode.as_deref() {
        None | Some("activities") => {
            tracing::info!("Starting Strava data synchronization");
            let outcomes = state.sync_service.sync_all().await?;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            let new_activities: u32 = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().ok())
                .map(|r| r.new_activities)
                .sum();
            tracing::info!(
                athletes = outcomes.len(),
                failed,
                new_activities,
                "Strava data synchronization finished"
            );
        }
        Some("maps") => {
            tracing::info!("Starting map synchronization");
            let outcomes = state.sync_service.sync_maps_all().await?;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            let updated: u32 = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().ok())
                .map(|r| r.updated)
                .sum();
            tracing::info!(
                athletes = outcomes.len(),
                failed,
                updated,
                "Map synchronization finished"
            );
        }
        Some(other) => {
            anyhow::bail!("unknown mode {other:?}, expected `activities` or `maps`");
        }
    }

    Ok(())
}
