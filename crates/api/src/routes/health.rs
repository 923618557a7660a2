//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use shared::pagination::PageRequest;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: BackendHealth,
    pub geocoding_enabled: bool,
    pub active_sessions: usize,
    pub max_sessions: usize,
}

/// Geofence store health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendHealth {
    /// `http` for the fleet backend, `memory` for the local store.
    pub kind: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Lists a single geofence to prove the store answers.
async fn probe_store(state: &AppState) -> (bool, u64) {
    let start = Instant::now();
    let probe = PageRequest { page: 1, limit: 1 };
    let connected = state.store.list_geofences(&probe, None).await.is_ok();
    (connected, start.elapsed().as_millis() as u64)
}

/// Full health check endpoint.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let (connected, latency_ms) = probe_store(&state).await;

    let response = HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: BackendHealth {
            kind: if state.config.backend.is_remote() {
                "http"
            } else {
                "memory"
            }
            .to_string(),
            connected,
            latency_ms: connected.then_some(latency_ms),
        },
        geocoding_enabled: state.config.geocoding.enabled,
        active_sessions: state.sessions.len().await,
        max_sessions: state.sessions.max_sessions(),
    };

    if connected {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the geofence store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let (connected, _) = probe_store(&state).await;

    if connected {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
