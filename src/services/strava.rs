// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for OAuth and activity listing.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Paginated activity listing (optionally bounded by `after`)
//! - Token refresh when expired
//! - Rate limit and revoked-token detection

use crate::error::AppError;
use crate::models::{Activity, ActivityMap, AthleteProfile};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// OAuth scopes requested at login.
pub const OAUTH_SCOPE: &str = "read,activity:read_all";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials and base URLs.
    pub fn new(
        client_id: String,
        client_secret: String,
        api_url: impl Into<String>,
        oauth_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            oauth_url: oauth_url.into(),
            client_id,
            client_secret,
        }
    }

    /// URL of the Strava consent page for this client.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             approval_prompt=force&\
             scope={}&\
             state={}",
            self.oauth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            OAUTH_SCOPE,
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens and the athlete profile.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(AppError::StravaApi(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("Failed to parse token response: {}", e)))
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// List the athlete's activities, one page at a time.
    ///
    /// `after` (Unix timestamp) limits results to activities started later.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            // 400 on the token endpoint means the refresh token was revoked
            if status.as_u16() == 401 || (status.as_u16() == 400 && body.contains("invalid")) {
                return Err(AppError::StravaApi(
                    AppError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    /// Strava may keep the refresh token unchanged and omit it
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: i64,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub profile_medium: Option<String>,
    pub profile: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub sex: Option<String>,
}

impl From<StravaAthlete> for AthleteProfile {
    fn from(a: StravaAthlete) -> Self {
        Self {
            id: a.id,
            username: a.username,
            firstname: a.firstname,
            lastname: a.lastname,
            profile_medium: a.profile_medium,
            profile: a.profile,
            city: a.city,
            state: a.state,
            country: a.country,
            sex: a.sex,
        }
    }
}

/// Map block of a listed activity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaMap {
    pub summary_polyline: Option<String>,
}

/// Summary activity as returned by `GET /athlete/activities`.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub moving_time: i64,
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    pub sport_type: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Local wall-clock time, sent with a misleading `Z` suffix
    pub start_date_local: DateTime<Utc>,
    pub timezone: Option<String>,
    /// Seconds; Strava sends a float
    pub utc_offset: Option<f64>,
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
    pub average_speed: Option<f64>,
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
    #[serde(default)]
    pub map: Option<StravaMap>,
    #[serde(default)]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub end_latlng: Option<Vec<f64>>,
}

impl StravaActivitySummary {
    /// Map fields, with empty polylines and coordinates treated as absent.
    pub fn map_fields(&self) -> ActivityMap {
        ActivityMap {
            summary_polyline: self
                .map
                .as_ref()
                .and_then(|m| m.summary_polyline.clone())
                .filter(|p| !p.is_empty()),
            start_latlng: latlng_json(self.start_latlng.as_deref()),
            end_latlng: latlng_json(self.end_latlng.as_deref()),
        }
    }

    /// Build the stored row for `athlete_id`.
    pub fn into_activity(self, athlete_id: i64, now: DateTime<Utc>) -> Activity {
        let map = self.map_fields();
        let start_date_local = self.start_date_local.naive_utc();

        Activity {
            id: self.id,
            athlete_id,
            name: self.name,
            distance: self.distance,
            moving_time: self.moving_time,
            elapsed_time: self.elapsed_time,
            total_elevation_gain: self.total_elevation_gain,
            activity_type: self.activity_type,
            sport_type: self.sport_type,
            start_date: self.start_date,
            start_date_local,
            calculated_day: start_date_local.date(),
            timezone: self.timezone,
            utc_offset: self.utc_offset.map(|o| o.round() as i64),
            achievement_count: self.achievement_count,
            kudos_count: self.kudos_count,
            comment_count: self.comment_count,
            athlete_count: self.athlete_count,
            photo_count: self.photo_count,
            total_photo_count: self.total_photo_count,
            trainer: self.trainer,
            commute: self.commute,
            manual: self.manual,
            private: self.private,
            flagged: self.flagged,
            average_speed: self.average_speed,
            max_speed: self.max_speed,
            average_cadence: self.average_cadence,
            average_temp: self.average_temp,
            average_watts: self.average_watts,
            max_watts: self.max_watts,
            weighted_average_watts: self.weighted_average_watts,
            kilojoules: self.kilojoules,
            device_watts: self.device_watts,
            has_heartrate: self.has_heartrate,
            average_heartrate: self.average_heartrate,
            max_heartrate: self.max_heartrate,
            elev_high: self.elev_high,
            elev_low: self.elev_low,
            upload_id: self.upload_id,
            upload_id_str: self.upload_id_str,
            external_id: self.external_id,
            from_accepted_tag: self.from_accepted_tag,
            pr_count: self.pr_count,
            has_kudoed: self.has_kudoed,
            workout_type: self.workout_type,
            description: self.description,
            calories: self.calories,
            gear_id: self.gear_id,
            summary_polyline: map.summary_polyline,
            start_latlng: map.start_latlng,
            end_latlng: map.end_latlng,
            created_at: now,
            updated_at: now,
        }
    }
}

fn latlng_json(latlng: Option<&[f64]>) -> Option<String> {
    match latlng {
        Some([lat, lng]) => Some(format!("[{},{}]", lat, lng)),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::Database;
use crate::models::{Athlete, AthleteTokens};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

/// High-level Strava service that manages the token lifecycle.
///
/// This service encapsulates:
/// - OAuth code exchange and athlete create-or-update
/// - Lazy token refresh when expiring (10-minute margin)
/// - Per-athlete locking to prevent duplicate refresh calls
/// - Token-aware wrappers around API calls
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: Database,
    /// Per-athlete mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl StravaService {
    pub fn new(client: StravaClient, db: Database, refresh_locks: RefreshLocks) -> Self {
        Self {
            client,
            db,
            refresh_locks,
        }
    }

    /// Underlying API client.
    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a usable access token for the given athlete, refreshing first when
    /// `now > expires_at - margin`.
    ///
    /// A failed refresh leaves the stored tokens untouched and returns
    /// `ReauthRequired`; the athlete must log in again.
    pub async fn get_valid_access_token(&self, athlete_id: i64) -> Result<String, AppError> {
        let lock = self
            .refresh_locks
            .entry(athlete_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Read after acquiring the lock: a concurrent request may have refreshed.
        let athlete = self
            .db
            .get_athlete(athlete_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.ensure_fresh_tokens(&athlete, Utc::now().timestamp())
            .await
            .map(|tokens| tokens.access_token)
    }

    /// Return `athlete`'s tokens, refreshed and persisted if they are stale at `now`.
    async fn ensure_fresh_tokens(
        &self,
        athlete: &Athlete,
        now: i64,
    ) -> Result<AthleteTokens, AppError> {
        let tokens = athlete.tokens();
        if !tokens.needs_refresh(now) {
            return Ok(tokens);
        }

        tracing::info!(
            athlete_id = athlete.id,
            expires_at = tokens.expires_at,
            "Access token expired, refreshing"
        );

        let refreshed = match self.client.refresh_token(&tokens.refresh_token).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(athlete_id = athlete.id, error = %e, "Token refresh failed");
                return Err(AppError::ReauthRequired(e.to_string()));
            }
        };

        let new_tokens = AthleteTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token.unwrap_or(tokens.refresh_token),
            expires_at: refreshed.expires_at,
        };

        if !self.db.update_tokens(athlete.id, &new_tokens).await? {
            return Err(AppError::Unauthorized);
        }

        tracing::info!(
            athlete_id = athlete.id,
            expires_at = new_tokens.expires_at,
            "Token refreshed"
        );
        Ok(new_tokens)
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Handle OAuth callback: exchange the code, create or update the athlete.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<Athlete, AppError> {
        let token_response = self.client.exchange_code(code).await?;

        let tokens = AthleteTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: token_response.expires_at,
        };
        let profile = AthleteProfile::from(token_response.athlete);

        let athlete = self.db.upsert_athlete(&profile, &tokens).await?;

        tracing::info!(
            athlete_id = athlete.id,
            name = %athlete.display_name(),
            "OAuth callback handled, athlete stored"
        );

        Ok(athlete)
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    /// List one page of activities for an athlete.
    pub async fn list_activities(
        &self,
        athlete_id: i64,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let access_token = self.get_valid_access_token(athlete_id).await?;
        self.client
            .list_activities(&access_token, after, page, per_page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_JSON: &str = r#"{
        "id": 12345678987654321,
        "name": "Happy Friday",
        "distance": 28099.0,
        "moving_time": 4207,
        "elapsed_time": 4410,
        "total_elevation_gain": 516.0,
        "type": "Ride",
        "sport_type": "MountainBikeRide",
        "workout_type": null,
        "start_date": "2018-05-02T12:15:09Z",
        "start_date_local": "2018-05-02T05:15:09Z",
        "timezone": "(GMT-08:00) America/Los_Angeles",
        "utc_offset": -25200.0,
        "achievement_count": 0,
        "kudos_count": 3,
        "comment_count": 1,
        "athlete_count": 1,
        "photo_count": 0,
        "map": {"id": "a12345678908766", "summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@", "resource_state": 2},
        "trainer": false,
        "commute": false,
        "manual": false,
        "private": false,
        "flagged": false,
        "gear_id": "b12345678987654321",
        "from_accepted_tag": false,
        "average_speed": 6.679,
        "max_speed": 18.5,
        "average_watts": 185.5,
        "kilojoules": 780.5,
        "device_watts": false,
        "has_heartrate": false,
        "elev_high": 446.6,
        "elev_low": 17.2,
        "pr_count": 0,
        "total_photo_count": 2,
        "has_kudoed": false,
        "start_latlng": [37.83, -122.26],
        "end_latlng": []
    }"#;

    #[test]
    fn test_summary_into_activity() {
        let summary: StravaActivitySummary = serde_json::from_str(SUMMARY_JSON).unwrap();
        let now = Utc::now();
        let activity = summary.into_activity(134815, now);

        assert_eq!(activity.id, 12345678987654321);
        assert_eq!(activity.athlete_id, 134815);
        assert_eq!(activity.activity_type, "Ride");
        assert_eq!(activity.sport_type.as_deref(), Some("MountainBikeRide"));
        assert_eq!(activity.utc_offset, Some(-25200));
        // Local wall clock keeps the local date, not the UTC one
        assert_eq!(activity.calculated_day.to_string(), "2018-05-02");
        assert_eq!(
            activity.start_date_local.format("%H:%M:%S").to_string(),
            "05:15:09"
        );
        assert_eq!(
            activity.summary_polyline.as_deref(),
            Some("_p~iF~ps|U_ulLnnqC_mqNvxq`@")
        );
        assert_eq!(activity.start_latlng.as_deref(), Some("[37.83,-122.26]"));
        assert_eq!(activity.end_latlng, None);
        assert_eq!(activity.workout_type, None);
        assert_eq!(activity.created_at, now);
    }

    #[test]
    fn test_minimal_summary_parses() {
        let json = r#"{
            "id": 1,
            "start_date": "2024-01-01T10:00:00Z",
            "start_date_local": "2024-01-01T02:00:00Z"
        }"#;
        let summary: StravaActivitySummary = serde_json::from_str(json).unwrap();
        let activity = summary.into_activity(7, Utc::now());
        assert_eq!(activity.name, "");
        assert_eq!(activity.distance, 0.0);
        assert_eq!(activity.summary_polyline, None);
    }

    #[test]
    fn test_authorize_url() {
        let client = StravaClient::new(
            "1234".to_string(),
            "secret".to_string(),
            "https://api.example.com",
            "https://www.strava.com/oauth",
        );
        let url = client.authorize_url("http://localhost:8080/auth/strava/callback", "abc");

        assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
        assert!(url.contains("client_id=1234"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fstrava%2Fcallback"
        ));
        assert!(url.contains("approval_prompt=force"));
        assert!(url.contains("scope=read,activity:read_all"));
        assert!(url.contains("state=abc"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let json = r#"{"access_token": "a", "expires_at": 1700000000}"#;
        let parsed: TokenRefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.refresh_token, None);
    }
}
