//! Athlete model: Strava identity, profile and OAuth credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before `expires_at` at which an access token is treated as expired.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 10 * 60;

/// Athlete row stored in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Athlete {
    /// Strava athlete ID (primary key)
    pub id: i64,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    /// Medium-size profile picture URL
    pub profile_medium: Option<String>,
    /// Full-size profile picture URL
    pub profile: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub sex: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    /// Access token expiry (Unix timestamp, seconds)
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Athlete {
    /// Current OAuth credentials.
    pub fn tokens(&self) -> AthleteTokens {
        AthleteTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }

    /// "Firstname Lastname", falling back to the username or the numeric id.
    pub fn display_name(&self) -> String {
        let full = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            full
        } else if let Some(username) = self.username.as_deref().filter(|s| !s.is_empty()) {
            username.to_string()
        } else {
            format!("Athlete {}", self.id)
        }
    }
}

/// Profile fields written on every login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AthleteProfile {
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

/// OAuth token triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthleteTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp, seconds
    pub expires_at: i64,
}

impl AthleteTokens {
    /// Whether the access token must be refreshed before use at `now`
    /// (Unix seconds): `now > expires_at - margin`.
    pub fn needs_refresh(&self, now: i64) -> bool {
        now > self.expires_at - TOKEN_REFRESH_MARGIN_SECS
    }
}
