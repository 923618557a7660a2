//! Stateless geometry endpoints.
//!
//! The browser uses these to measure, encode and check shapes without
//! opening an edit session.

use axum::{http::StatusCode, Json};
use tracing::debug;

use domain::models::{GeometryPayload, Shape};
use domain::services::{codec, measurement, ShapeMetrics};

use crate::error::ApiError;

/// Perimeter and area of a shape.
///
/// POST /api/v1/geometry/metrics
pub async fn compute_metrics(Json(shape): Json<Shape>) -> Json<ShapeMetrics> {
    Json(measurement::compute_metrics(&shape))
}

/// Persisted wire form of a shape.
///
/// POST /api/v1/geometry/encode
pub async fn encode(Json(shape): Json<Shape>) -> Result<Json<GeometryPayload>, ApiError> {
    shape.validate()?;
    Ok(Json(codec::encode_geometry(&shape)))
}

/// POST /api/v1/geometry/decode
pub async fn decode(Json(payload): Json<GeometryPayload>) -> Result<Json<Shape>, ApiError> {
    let shape = codec::decode_geometry(&payload).map_err(|e| {
        debug!(geometry_type = %payload.geometry_type, error = %e, "Rejected geometry payload");
        ApiError::from(e)
    })?;
    Ok(Json(shape))
}

/// POST /api/v1/geometry/validate
pub async fn validate(Json(shape): Json<Shape>) -> Result<StatusCode, ApiError> {
    shape.validate()?;
    Ok(StatusCode::NO_CONTENT)
}
