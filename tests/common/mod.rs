// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use strava_dashboard::config::Config;
use strava_dashboard::db::Database;
use strava_dashboard::models::{Activity, Athlete, AthleteProfile, AthleteTokens};
use strava_dashboard::routes::create_router;
use strava_dashboard::AppState;

/// Athlete ID used by most tests.
#[allow(dead_code)]
pub const ATHLETE_ID: i64 = 12345;

/// Create a test app backed by a fresh in-memory database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default()).await
}

/// Same as `create_test_app`, pointing Strava calls at `strava_base_url`
/// (an httpmock server) for both the API and OAuth endpoints.
#[allow(dead_code)]
pub async fn create_test_app_with_strava(strava_base_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.strava_api_url = format!("{}/api/v3", strava_base_url);
    config.strava_oauth_url = format!("{}/oauth", strava_base_url);
    create_test_app_with_config(config).await
}

#[allow(dead_code)]
pub async fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config).await
}

#[allow(dead_code)]
pub async fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = Database::in_memory()
        .await
        .expect("Failed to open in-memory database");
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()), state)
}

/// Create a session token the auth middleware accepts.
#[allow(dead_code)]
pub fn create_test_jwt(athlete_id: i64, signing_key: &[u8]) -> String {
    strava_dashboard::middleware::auth::create_jwt(athlete_id, signing_key)
        .expect("Failed to create JWT")
}

/// Store an athlete whose access token expires at `expires_at`.
#[allow(dead_code)]
pub async fn seed_athlete(db: &Database, athlete_id: i64, expires_at: i64) -> Athlete {
    let profile = AthleteProfile {
        id: athlete_id,
        firstname: Some("Ada".to_string()),
        lastname: Some("Lovelace".to_string()),
        ..Default::default()
    };
    let tokens = AthleteTokens {
        access_token: format!("access-{}", athlete_id),
        refresh_token: format!("refresh-{}", athlete_id),
        expires_at,
    };
    db.upsert_athlete(&profile, &tokens)
        .await
        .expect("Failed to seed athlete")
}

/// Token expiry comfortably in the future.
#[allow(dead_code)]
pub fn fresh_expiry() -> i64 {
    Utc::now().timestamp() + 6 * 3600
}

#[allow(dead_code)]
pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("bad date")
}

/// Build a stored activity starting at 08:00 local (and UTC) on `local_day`.
#[allow(dead_code)]
pub fn make_activity(
    id: i64,
    athlete_id: i64,
    local_day: &str,
    activity_type: &str,
    distance_m: f64,
    moving_time_s: i64,
) -> Activity {
    let local: NaiveDateTime = day(local_day).and_hms_opt(8, 0, 0).expect("bad time");
    let start: DateTime<Utc> = local.and_utc();
    let now = Utc::now();

    Activity {
        id,
        athlete_id,
        name: format!("{} {}", activity_type, id),
        distance: distance_m,
        moving_time: moving_time_s,
        elapsed_time: moving_time_s + 60,
        total_elevation_gain: 10.0,
        activity_type: activity_type.to_string(),
        sport_type: Some(activity_type.to_string()),
        start_date: start,
        start_date_local: local,
        calculated_day: local.date(),
        timezone: Some("(GMT+00:00) Europe/London".to_string()),
        utc_offset: Some(0),
        achievement_count: None,
        kudos_count: None,
        comment_count: None,
        athlete_count: None,
        photo_count: None,
        total_photo_count: None,
        trainer: Some(false),
        commute: Some(false),
        manual: Some(false),
        private: Some(false),
        flagged: Some(false),
        average_speed: Some(if moving_time_s > 0 {
            distance_m / moving_time_s as f64
        } else {
            0.0
        }),
        max_speed: None,
        average_cadence: None,
        average_temp: None,
        average_watts: None,
        max_watts: None,
        weighted_average_watts: None,
        kilojoules: None,
        device_watts: None,
        has_heartrate: Some(false),
        average_heartrate: None,
        max_heartrate: None,
        elev_high: None,
        elev_low: None,
        upload_id: None,
        upload_id_str: None,
        external_id: None,
        from_accepted_tag: None,
        pr_count: None,
        has_kudoed: None,
        workout_type: None,
        description: None,
        calories: None,
        gear_id: None,
        summary_polyline: None,
        start_latlng: None,
        end_latlng: None,
        created_at: now,
        updated_at: now,
    }
}

/// One item of a Strava `/athlete/activities` listing.
#[allow(dead_code)]
pub fn summary_json(id: i64, start_date: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Morning Run {}", id),
        "distance": 5000.0,
        "moving_time": 1500,
        "elapsed_time": 1600,
        "total_elevation_gain": 42.0,
        "type": "Run",
        "sport_type": "Run",
        "start_date": start_date,
        "start_date_local": start_date,
        "timezone": "(GMT+00:00) Europe/London",
        "utc_offset": 0.0,
        "average_speed": 3.33,
        "max_speed": 4.1,
        "has_heartrate": false,
        "map": {"id": format!("a{}", id), "summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"},
        "start_latlng": [38.5, -120.2],
        "end_latlng": [43.252, -126.453]
    })
}

/// A listing page of `count` activities with consecutive ids from `first_id`.
#[allow(dead_code)]
pub fn summary_page(first_id: i64, count: usize) -> Value {
    Value::Array(
        (0..count as i64)
            .map(|i| summary_json(first_id + i, "2024-03-01T08:00:00Z"))
            .collect(),
    )
}
