// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod route;
pub mod stats;
pub mod strava;
pub mod sync;

pub use route::{route_geometry, RouteGeometry};
pub use stats::{DashboardStats, StatsService};
pub use strava::{RefreshLocks, StravaClient, StravaService};
pub use sync::{SyncReport, SyncService};
