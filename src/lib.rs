// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava dashboard: mirror your Strava history and see where you stand.
//!
//! This crate provides the backend API: the Strava OAuth handshake, the
//! incremental activity sync into SQLite, streaks and period aggregates.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{StatsService, StravaClient, StravaService, SyncService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub strava_service: StravaService,
    pub sync_service: SyncService,
    pub stats_service: StatsService,
}

impl AppState {
    /// Wire the services on top of an open database.
    pub fn new(config: Config, db: Database) -> Self {
        let client = StravaClient::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
            config.strava_api_url.clone(),
            config.strava_oauth_url.clone(),
        );
        let refresh_locks = Arc::new(dashmap::DashMap::new());
        let strava_service = StravaService::new(client, db.clone(), refresh_locks);

        Self {
            sync_service: SyncService::new(strava_service.clone(), db.clone()),
            stats_service: StatsService::new(db.clone()),
            strava_service,
            config,
            db,
        }
    }
}
