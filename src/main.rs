// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava dashboard API server.
//!
//! Serves the OAuth handshake and the dashboard API over a local SQLite
//! mirror of each athlete's Strava activities.

use std::sync::Arc;
use strava_dashboard::{config::Config, db::Database, logging::init_logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Strava dashboard API");

    let db = Database::connect(&config.database_url).await?;

    let state = Arc::new(AppState::new(config.clone(), db));
    let app = strava_dashboard::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
