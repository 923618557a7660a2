//! Edit session endpoint handlers.
//!
//! A session is one browser console: the committed geofence list plus the
//! editor state machine. Every response carries the map-surface commands
//! recorded since the previous one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{Coordinate, Geofence, ShapeType};
use domain::services::{
    FormField, GeofenceConsole, OverlayGeometry, RecordingMapSurface, SyncOutcome,
};
use shared::pagination::PageRequest;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_geofence_committed;
use crate::services::sessions::{ConsoleSession, SessionView, SharedSession};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[validate(length(max = 100, message = "Search text must be at most 100 characters"))]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub shape_type: ShapeType,
    pub center: Option<Coordinate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PointRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
}

impl PointRequest {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct InsertVertexRequest {
    pub index: usize,
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct FormEditRequest {
    pub field: String,
    pub value: String,
    /// Vertex index for `vertexLatitude` / `vertexLongitude`
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeTypeRequest {
    pub shape_type: ShapeType,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(max = 100, message = "Search text must be at most 100 characters"))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub geofence: Geofence,
    pub session: SessionView,
}

async fn session(state: &AppState, session_id: Uuid) -> Result<SharedSession, ApiError> {
    Ok(state.sessions.get(session_id).await?)
}

fn with_outcome(mut view: SessionView, outcome: SyncOutcome) -> SessionView {
    view.outcome = Some(outcome.as_str());
    view
}

/// Open a session and load the first page of geofences.
///
/// POST /api/v1/sessions
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    request.validate()?;
    let page = PageRequest::from_query(
        request.page,
        Some(request.limit.unwrap_or(state.config.backend.page_size)),
    )?;

    state.sessions.ensure_capacity().await?;

    let mut console = GeofenceConsole::new(
        RecordingMapSurface::new(),
        state.config.editor.settings(),
        state.store.clone(),
        state.geocoder.clone(),
    );
    console.open(page, request.search).await?;

    let shared = state.sessions.insert(ConsoleSession::new(console)).await?;
    let view = shared.lock().await.view();
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let view = shared.lock().await.view();
    Ok(Json(view))
}

/// Close a session, abandoning any unfinished edit.
///
/// DELETE /api/v1/sessions/:session_id
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let shared = state.sessions.remove(session_id).await?;
    shared.lock().await.console.close();
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:session_id/draw
pub async fn start_drawing(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<DrawRequest>,
) -> Result<Json<SessionView>, ApiError> {
    if let Some(center) = &request.center {
        center.validate()?;
    }

    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session
        .console
        .start_drawing(request.shape_type, request.center)?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:session_id/place
pub async fn place(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<PointRequest>,
) -> Result<Json<SessionView>, ApiError> {
    request.validate()?;

    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.place(request.coordinate())?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:session_id/edit/:geofence_id
pub async fn begin_edit(
    State(state): State<AppState>,
    Path((session_id, geofence_id)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.begin_edit(&geofence_id)?;
    Ok(Json(session.view()))
}

/// Geometry the user produced by dragging or reshaping the overlay.
///
/// POST /api/v1/sessions/:session_id/overlay-mutations
pub async fn overlay_mutation(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(geometry): Json<OverlayGeometry>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    let outcome = session.console.apply_overlay_mutation(geometry)?;
    Ok(Json(with_outcome(session.view(), outcome)))
}

/// POST /api/v1/sessions/:session_id/form
pub async fn form_edit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<FormEditRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let field = FormField::parse(&request.field, request.index).ok_or_else(|| {
        ApiError::validation(format!("Unknown form field: {}", request.field))
    })?;

    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    let outcome = session.console.apply_form_edit(field, &request.value)?;
    Ok(Json(with_outcome(session.view(), outcome)))
}

/// POST /api/v1/sessions/:session_id/shape-type
pub async fn switch_shape_type(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ShapeTypeRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.switch_shape_type(request.shape_type)?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:session_id/vertices
pub async fn insert_vertex(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<InsertVertexRequest>,
) -> Result<Json<SessionView>, ApiError> {
    request.validate()?;

    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session
        .console
        .insert_vertex(request.index, Coordinate::new(request.lat, request.lng))?;
    Ok(Json(session.view()))
}

/// DELETE /api/v1/sessions/:session_id/vertices/:index
pub async fn remove_vertex(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.remove_vertex(index)?;
    Ok(Json(session.view()))
}

/// Reverse geocode the working shape into the address field.
///
/// POST /api/v1/sessions/:session_id/address
pub async fn refresh_address(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.refresh_address().await?;
    Ok(Json(session.view()))
}

/// Re-list the geofences filtered by name.
///
/// POST /api/v1/sessions/:session_id/search
pub async fn search(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SessionView>, ApiError> {
    request.validate()?;

    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.search(&request.text).await?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:session_id/commit
pub async fn commit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CommitResponse>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;

    let mode = if session.console.editor().editing_id().is_some() {
        "update"
    } else {
        "create"
    };
    let geofence = session.console.commit().await?;
    record_geofence_committed(mode);

    info!(
        session_id = %session_id,
        geofence_id = %geofence.id,
        mode,
        "Session committed geofence"
    );

    Ok(Json(CommitResponse {
        geofence,
        session: session.view(),
    }))
}

/// POST /api/v1/sessions/:session_id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.cancel()?;
    Ok(Json(session.view()))
}

/// DELETE /api/v1/sessions/:session_id/geofences/:geofence_id
pub async fn delete_geofence(
    State(state): State<AppState>,
    Path((session_id, geofence_id)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = session(&state, session_id).await?;
    let mut session = shared.lock().await;
    session.console.delete(&geofence_id).await?;
    Ok(Json(session.view()))
}
