// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth state encoding/decoding tests.
//!
//! These tests verify that frontend URLs survive the signed roundtrip
//! through the OAuth state parameter and that tampering is detected.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use strava_dashboard::routes::auth::{sign_state, verify_and_decode_state};

const SECRET: &[u8] = b"test_state_key_32_bytes_minimum";

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[test]
fn test_oauth_state_roundtrip_localhost() {
    let frontend_url = "http://localhost:5173";
    let state = sign_state(frontend_url, now_ms(), SECRET).unwrap();

    assert_eq!(
        verify_and_decode_state(&state, SECRET),
        Some(frontend_url.to_string())
    );
}

#[test]
fn test_oauth_state_roundtrip_production() {
    let frontend_url = "https://dashboard.example.com";
    let state = sign_state(frontend_url, now_ms(), SECRET).unwrap();

    assert_eq!(
        verify_and_decode_state(&state, SECRET),
        Some(frontend_url.to_string())
    );
}

#[test]
fn test_oauth_state_with_path_and_pipe() {
    // Frontend URLs shouldn't contain '|', but the decoder must not split on it
    let frontend_url = "https://example.com/some/path?tab=a|b";
    let state = sign_state(frontend_url, now_ms(), SECRET).unwrap();

    assert_eq!(
        verify_and_decode_state(&state, SECRET),
        Some(frontend_url.to_string())
    );
}

#[test]
fn test_oauth_state_unsigned_rejected() {
    // The old unsigned "url|timestamp" layout must not be accepted.
    let unsigned = URL_SAFE_NO_PAD.encode(format!("https://evil.example|{:x}", now_ms()));
    assert_eq!(verify_and_decode_state(&unsigned, SECRET), None);
}

#[test]
fn test_oauth_state_decode_invalid() {
    assert_eq!(verify_and_decode_state("not-valid-base64!!!", SECRET), None);
    assert_eq!(verify_and_decode_state("", SECRET), None);
}

#[test]
fn test_oauth_state_base64_url_safe() {
    let state = sign_state("https://example.com/?a=b&c=d", now_ms(), SECRET).unwrap();

    assert!(!state.contains('+'), "State should not contain '+'");
    assert!(!state.contains('/'), "State should not contain '/'");
    assert!(!state.contains('='), "State should not contain '=' padding");
}
