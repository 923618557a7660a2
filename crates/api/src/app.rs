use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use domain::services::{Geocoder, GeofenceStore};
use persistence::{HttpGeofenceStore, InMemoryGeofenceStore, StoreError};

use crate::config::{BackendConfig, Config};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{geometry, health, sessions};
use crate::services::sessions::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn GeofenceStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub sessions: Arc<SessionRegistry>,
}

/// Builds the geofence store selected by the backend configuration.
pub fn build_store(config: &BackendConfig) -> Result<Arc<dyn GeofenceStore>, StoreError> {
    if config.is_remote() {
        info!(url = %config.url, "Using fleet backend geofence store");
        Ok(Arc::new(HttpGeofenceStore::new(config.client_config())?))
    } else {
        warn!("backend.url is empty, geofences are kept in memory");
        Ok(Arc::new(InMemoryGeofenceStore::new()))
    }
}

pub fn create_app(
    config: Config,
    store: Arc<dyn GeofenceStore>,
    geocoder: Arc<dyn Geocoder>,
) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        store,
        geocoder,
        sessions: Arc::new(SessionRegistry::new(
            config.editor.max_sessions,
            Duration::from_secs(config.editor.session_idle_secs),
        )),
        config: config.clone(),
    };

    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Stateless geometry computations
    let geometry_routes = Router::new()
        .route("/api/v1/geometry/metrics", post(geometry::compute_metrics))
        .route("/api/v1/geometry/encode", post(geometry::encode))
        .route("/api/v1/geometry/decode", post(geometry::decode))
        .route("/api/v1/geometry/validate", post(geometry::validate));

    let session_routes = Router::new()
        .route("/api/v1/sessions", post(sessions::open_session))
        .route(
            "/api/v1/sessions/:session_id",
            get(sessions::get_session).delete(sessions::close_session),
        )
        .route("/api/v1/sessions/:session_id/draw", post(sessions::start_drawing))
        .route("/api/v1/sessions/:session_id/place", post(sessions::place))
        .route(
            "/api/v1/sessions/:session_id/edit/:geofence_id",
            post(sessions::begin_edit),
        )
        .route(
            "/api/v1/sessions/:session_id/overlay-mutations",
            post(sessions::overlay_mutation),
        )
        .route("/api/v1/sessions/:session_id/form", post(sessions::form_edit))
        .route(
            "/api/v1/sessions/:session_id/shape-type",
            post(sessions::switch_shape_type),
        )
        .route(
            "/api/v1/sessions/:session_id/vertices",
            post(sessions::insert_vertex),
        )
        .route(
            "/api/v1/sessions/:session_id/vertices/:index",
            delete(sessions::remove_vertex),
        )
        .route(
            "/api/v1/sessions/:session_id/address",
            post(sessions::refresh_address),
        )
        .route("/api/v1/sessions/:session_id/search", post(sessions::search))
        .route("/api/v1/sessions/:session_id/commit", post(sessions::commit))
        .route("/api/v1/sessions/:session_id/cancel", post(sessions::cancel))
        .route(
            "/api/v1/sessions/:session_id/geofences/:geofence_id",
            delete(sessions::delete_geofence),
        );

    Router::new()
        .merge(public_routes)
        .merge(geometry_routes)
        .merge(session_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
