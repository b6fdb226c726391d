// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route geometry from Strava summary polylines.

use geo::{BoundingRect, LineString};
use serde::Serialize;

/// Decoded route ready for a map view.
#[derive(Debug, Clone, Serialize)]
pub struct RouteGeometry {
    /// GeoJSON LineString in `[lng, lat]` order
    pub geometry: geojson::Geometry,
    /// `[min_lng, min_lat, max_lng, max_lat]`
    pub bbox: [f64; 4],
    pub points: usize,
}

/// Decode an encoded polyline (Strava format, precision 5).
pub fn decode_route(encoded: &str) -> Result<LineString<f64>, RouteError> {
    polyline::decode_polyline(encoded, 5).map_err(|e| RouteError::PolylineError(e.to_string()))
}

/// Build the map payload for an activity's summary polyline.
///
/// Returns `Ok(None)` for an empty route.
pub fn route_geometry(encoded: &str) -> Result<Option<RouteGeometry>, RouteError> {
    let line = decode_route(encoded)?;
    let Some(rect) = line.bounding_rect() else {
        return Ok(None);
    };

    Ok(Some(RouteGeometry {
        geometry: geojson::Geometry::new(geojson::Value::from(&line)),
        bbox: [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
        points: line.0.len(),
    }))
}

/// Parse a stored `[lat, lng]` JSON pair.
pub fn parse_latlng(stored: &str) -> Option<[f64; 2]> {
    serde_json::from_str(stored).ok()
}

/// Errors from route decoding.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to decode polyline: {0}")]
    PolylineError(String),
}
