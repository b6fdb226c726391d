// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::{is_local_dev_url, Config};
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Cookie binding an in-flight OAuth `state` to the browser that started it.
pub const OAUTH_STATE_COOKIE: &str = "strava_oauth_state";

/// How long a login attempt may take at Strava.
const OAUTH_STATE_TTL_SECS: i64 = 10 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/strava", get(auth_start))
        .route("/auth/strava/callback", get(auth_callback))
        .route("/auth/logout", get(logout).post(logout))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to return to once the flow completes.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to the Strava consent page.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<AuthStartParams>,
    headers: HeaderMap,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = match params.redirect_uri {
        Some(url) if is_allowed_frontend(&state.config, &url) => url,
        Some(url) => {
            tracing::warn!(redirect_uri = %url, "Ignoring untrusted redirect_uri");
            state.config.frontend_url.clone()
        }
        None => state.config.frontend_url.clone(),
    };

    let oauth_state = sign_state(
        &frontend_url,
        chrono::Utc::now().timestamp_millis(),
        &state.config.oauth_state_key,
    )?;

    let callback_url = format!("{}/auth/strava/callback", request_origin(&headers));
    let auth_url = state
        .strava_service
        .client()
        .authorize_url(&callback_url, &oauth_state);

    tracing::info!(
        client_id = %state.config.strava_client_id,
        frontend_url = %frontend_url,
        "Starting OAuth flow, redirecting to Strava"
    );

    let jar = jar.add(
        Cookie::build((OAUTH_STATE_COOKIE, oauth_state))
            .path("/auth")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(!state.config.is_local_frontend())
            .max_age(time::Duration::seconds(OAUTH_STATE_TTL_SECS)),
    );

    Ok((jar, Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, store the athlete, start a session.
///
/// Every outcome is a redirect to the frontend; failures carry `?error=`.
/// The `state` must carry a valid signature and match the cookie set by
/// `auth_start` in this browser, otherwise no code is exchanged.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(state_cookie_removal(&state.config));

    let Some(frontend_url) = verify_callback_state(
        params.state.as_deref(),
        expected_state.as_deref(),
        &state.config.oauth_state_key,
    ) else {
        tracing::warn!("Missing, invalid or unbound state parameter");
        return (
            jar,
            redirect_with(&state.config.frontend_url, "error", "invalid_state"),
        );
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return (jar, redirect_with(&frontend_url, "error", &error));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return (jar, redirect_with(&frontend_url, "error", "missing_code"));
    };

    let athlete = match state.strava_service.handle_oauth_callback(&code).await {
        Ok(athlete) => athlete,
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            return (jar, redirect_with(&frontend_url, "error", "token_exchange_failed"));
        }
    };

    let jwt = match create_jwt(athlete.id, &state.config.jwt_signing_key) {
        Ok(jwt) => jwt,
        Err(e) => {
            tracing::error!(error = %e, "JWT creation failed");
            return (jar, redirect_with(&frontend_url, "error", "session_failed"));
        }
    };

    // Initial sync; the dashboard can still be shown if this fails.
    match state.sync_service.sync_athlete(athlete.id).await {
        Ok(report) => tracing::info!(
            athlete_id = athlete.id,
            new_activities = report.new_activities,
            "Initial sync complete"
        ),
        Err(e) => tracing::warn!(athlete_id = athlete.id, error = %e, "Initial sync failed"),
    }

    let jar = jar.add(session_cookie(&state.config, jwt));
    (jar, redirect_with(&frontend_url, "message", "logged_in"))
}

/// Logout - clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!state.config.is_local_frontend());

    (
        jar.remove(removal),
        redirect_with(&state.config.frontend_url, "message", "logged_out"),
    )
}

fn state_cookie_removal(config: &Config) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.is_local_frontend())
        .build()
}

/// Frontend URL from a callback `state` that is signed and equal to the
/// value this browser was given when the flow started.
fn verify_callback_state(
    state: Option<&str>,
    expected: Option<&str>,
    secret: &[u8],
) -> Option<String> {
    let (state, expected) = (state?, expected?);
    if !bool::from(state.as_bytes().ct_eq(expected.as_bytes())) {
        return None;
    }
    verify_and_decode_state(state, secret)
}

fn session_cookie(config: &Config, jwt: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.is_local_frontend())
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

fn redirect_with(frontend_url: &str, key: &str, value: &str) -> Redirect {
    let sep = if frontend_url.contains('?') { '&' } else { '?' };
    Redirect::temporary(&format!(
        "{}{}{}={}",
        frontend_url,
        sep,
        key,
        urlencoding::encode(value)
    ))
}

/// Origin (scheme + host) the browser used to reach us.
fn request_origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let hostname = host.rsplit_once(':').map_or(host, |(name, _)| name);
    let scheme = if hostname == "localhost" || hostname == "127.0.0.1" {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

/// Frontends allowed as post-login redirect targets.
pub fn is_allowed_frontend(config: &Config, url: &str) -> bool {
    url == config.frontend_url || is_local_dev_url(url)
}

/// Sign the frontend URL into an OAuth state value:
/// base64url("frontend_url|timestamp_hex|signature_hex").
pub fn sign_state(frontend_url: &str, timestamp_ms: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", frontend_url, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify HMAC signature and decode the frontend URL from the OAuth state parameter.
pub fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL may itself contain '|', so split the two trailing fields off the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch");
        return None;
    }

    Some(frontend_url.to_string())
}
