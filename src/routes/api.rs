// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated athletes.

use crate::db::ActivityFilter;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, Athlete, SeriesBucket};
use crate::services::route::{parse_latlng, route_geometry, RouteGeometry};
use crate::services::{DashboardStats, SyncReport};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Activities per page in the activity list.
pub const ACTIVITIES_PER_PAGE: u32 = 20;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/activities", get(get_activities))
        .route("/api/activities/{id}", get(get_activity))
        .route("/api/stats/weekly", get(get_weekly))
        .route("/api/stats/monthly", get(get_monthly))
        .route("/api/refresh", post(refresh_activities))
}

/// Local calendar day the dashboard is computed for.
fn local_today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Load the session's athlete; a session without a stored athlete is unauthenticated.
async fn current_athlete(state: &AppState, user: AuthUser) -> Result<Athlete> {
    state
        .db
        .get_athlete(user.athlete_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

// ─── Profile ─────────────────────────────────────────────────

/// Current athlete response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub profile_picture: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl From<&Athlete> for AthleteResponse {
    fn from(a: &Athlete) -> Self {
        Self {
            athlete_id: a.id,
            display_name: a.display_name(),
            username: a.username.clone(),
            firstname: a.firstname.clone(),
            lastname: a.lastname.clone(),
            profile_picture: a.profile_medium.clone().or_else(|| a.profile.clone()),
            city: a.city.clone(),
            country: a.country.clone(),
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AthleteResponse>> {
    let athlete = current_athlete(&state, user).await?;
    Ok(Json(AthleteResponse::from(&athlete)))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct DashboardResponse {
    pub athlete: AthleteResponse,
    pub date: String,
    #[serde(flatten)]
    pub stats: DashboardStats,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>> {
    let athlete = current_athlete(&state, user).await?;
    let today = local_today();

    let stats = state.stats_service.dashboard(athlete.id, today).await?;

    Ok(Json(DashboardResponse {
        athlete: AthleteResponse::from(&athlete),
        date: today.to_string(),
        stats,
    }))
}

// ─── Series ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SeriesResponse {
    pub periods: Vec<SeriesBucket>,
}

/// Last 12 weeks, newest first.
async fn get_weekly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SeriesResponse>> {
    let athlete = current_athlete(&state, user).await?;
    let periods = state.stats_service.weekly(athlete.id, local_today()).await?;
    Ok(Json(SeriesResponse { periods }))
}

/// Last 365 days by month, newest first.
async fn get_monthly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SeriesResponse>> {
    let athlete = current_athlete(&state, user).await?;
    let periods = state.stats_service.monthly(athlete.id, local_today()).await?;
    Ok(Json(SeriesResponse { periods }))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct ActivitiesQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    page: i64,
    /// Case-insensitive activity type filter
    #[serde(default, rename = "type")]
    activity_type: Option<String>,
}

fn default_page() -> i64 {
    1
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub sport_type: Option<String>,
    pub start_date: String,
    pub start_date_local: String,
    pub distance_km: f64,
    pub moving_time: String,
    pub total_elevation_gain: f64,
    pub pace_per_km: Option<String>,
    pub has_map: bool,
}

impl From<&Activity> for ActivitySummary {
    fn from(a: &Activity) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            activity_type: a.activity_type.clone(),
            sport_type: a.sport_type.clone(),
            start_date: format_utc_rfc3339(a.start_date),
            start_date_local: a.start_date_local.format("%Y-%m-%dT%H:%M:%S").to_string(),
            distance_km: a.distance_km(),
            moving_time: a.moving_time_formatted(),
            total_elevation_gain: a.total_elevation_gain,
            pace_per_km: a.pace_per_km(),
            has_map: a.summary_polyline.is_some(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
    pub page: u32,
    pub per_page: u32,
    /// Activities matching the filter, across all pages
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: i64,
    pub total_pages: u32,
    /// Distinct types the athlete has recorded (for the filter control)
    pub types: Vec<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
}

/// List the athlete's activities, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let page = u32::try_from(params.page)
        .map_err(|_| AppError::BadRequest("Page number out of range".to_string()))?;
    let offset = (page - 1)
        .checked_mul(ACTIVITIES_PER_PAGE)
        .ok_or_else(|| AppError::BadRequest("Page number causes overflow".to_string()))?;

    let athlete = current_athlete(&state, user).await?;

    let filter = ActivityFilter {
        activity_type: params
            .activity_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
    };

    tracing::debug!(
        athlete_id = athlete.id,
        page,
        activity_type = ?filter.activity_type,
        "Fetching activities"
    );

    let activities = state
        .db
        .list_activities(athlete.id, &filter, ACTIVITIES_PER_PAGE, offset)
        .await?;
    let total = state.db.count_activities(athlete.id, &filter).await?;
    let types = state.db.activity_types(athlete.id).await?;

    let total_pages = (total.max(0) as u64).div_ceil(ACTIVITIES_PER_PAGE as u64) as u32;

    Ok(Json(ActivitiesResponse {
        activities: activities.iter().map(ActivitySummary::from).collect(),
        page,
        per_page: ACTIVITIES_PER_PAGE,
        total,
        total_pages,
        types,
        activity_type: filter.activity_type,
    }))
}

// ─── Activity Detail ─────────────────────────────────────────

#[derive(Serialize)]
pub struct ActivityDetailResponse {
    pub activity: Activity,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub pace_per_km: Option<String>,
    pub moving_time: String,
    pub route: Option<RouteGeometry>,
    pub start_latlng: Option<[f64; 2]>,
    pub end_latlng: Option<[f64; 2]>,
    /// Same type, same month and day, other occurrences
    pub similar: Vec<ActivitySummary>,
}

/// One activity with its route and same-day history.
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<i64>,
) -> Result<Json<ActivityDetailResponse>> {
    let activity = state
        .db
        .get_activity(activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;

    if activity.athlete_id != user.athlete_id {
        tracing::warn!(
            athlete_id = user.athlete_id,
            activity_id,
            "Denied access to another athlete's activity"
        );
        return Err(AppError::Forbidden);
    }

    let similar = state.db.similar_activities(&activity).await?;

    // A corrupt polyline should not hide the rest of the activity.
    let route = match activity.summary_polyline.as_deref() {
        Some(encoded) => route_geometry(encoded).unwrap_or_else(|e| {
            tracing::warn!(activity_id, error = %e, "Failed to decode route");
            None
        }),
        None => None,
    };

    Ok(Json(ActivityDetailResponse {
        distance_km: activity.distance_km(),
        speed_kmh: activity.average_speed_kmh(),
        pace_per_km: activity.pace_per_km(),
        moving_time: activity.moving_time_formatted(),
        route,
        start_latlng: activity.start_latlng.as_deref().and_then(parse_latlng),
        end_latlng: activity.end_latlng.as_deref().and_then(parse_latlng),
        similar: similar.iter().map(ActivitySummary::from).collect(),
        activity,
    }))
}

// ─── Manual Refresh ──────────────────────────────────────────

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub pages: u32,
    pub new_activities: u32,
    pub current_streak: i64,
}

impl From<SyncReport> for RefreshResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            message: format!(
                "Data synchronization complete. {} new activities added.",
                report.new_activities
            ),
            pages: report.pages,
            new_activities: report.new_activities,
            current_streak: report.streak.current_streak,
        }
    }
}

/// Sync the session's athlete now.
async fn refresh_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RefreshResponse>> {
    let athlete = current_athlete(&state, user).await?;

    tracing::info!(athlete_id = athlete.id, "Manual refresh requested");
    let report = state.sync_service.sync_athlete(athlete.id).await?;

    Ok(Json(RefreshResponse::from(report)))
}
