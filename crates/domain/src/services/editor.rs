//! Edit synchronization state machine.
//!
//! While a geofence is being drawn or edited three representations must agree:
//! the live overlay on the map surface, the working [`Shape`], and the form
//! fields. Exactly one direction of synchronization is active at a time:
//!
//! * `Editing`: overlay → shape → form. Overlay mutations are the source of
//!   truth; [`GeofenceEditor::apply_overlay_mutation`] takes no map surface
//!   and therefore cannot write an overlay back.
//! * `FormDriven`: form → shape → overlay. Programmatic overlay writes are
//!   wrapped in mutation suppression, and any event that still comes back is
//!   compared against the last geometry we wrote and dropped as an echo.
//!
//! Metrics are recomputed synchronously on every shape change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EditorError, PersistenceError, ValidationError};
use crate::models::coordinate::Coordinate;
use crate::models::geofence::{
    Geofence, GeofenceMetadata, GeofencePayload, Visibility, DEFAULT_COLOR,
};
use crate::models::shape::{Shape, ShapeType};
use crate::services::map_surface::{
    render_shape, MapSurface, OverlayGeometry, OverlayHandle, OverlayStyle,
};
use crate::services::measurement::{compute_metrics, ShapeMetrics};

/// Defaults used to seed new shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub default_center: Coordinate,
    pub default_radius_meters: f64,
    /// Half the side of the default square polygon, in degrees.
    pub default_polygon_span_degrees: f64,
    pub default_color: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_center: Coordinate::new(24.8607, 67.0011),
            default_radius_meters: 500.0,
            default_polygon_span_degrees: 0.005,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }
}

impl EditorSettings {
    /// Fresh default geometry of `shape_type` around `center`.
    pub fn seed(&self, shape_type: ShapeType, center: Coordinate) -> Shape {
        match shape_type {
            ShapeType::Circle => Shape::circle(center, self.default_radius_meters),
            ShapeType::Polygon => Shape::square_around(center, self.default_polygon_span_degrees),
        }
    }
}

/// Editor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditState {
    Idle,
    Drawing,
    Editing,
    FormDriven,
    Committing,
}

impl EditState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditState::Idle => "idle",
            EditState::Drawing => "drawing",
            EditState::Editing => "editing",
            EditState::FormDriven => "form_driven",
            EditState::Committing => "committing",
        }
    }

    /// Whether a shape is open for edits.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EditState::Drawing | EditState::Editing | EditState::FormDriven
        )
    }
}

impl std::fmt::Display for EditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which representation currently drives the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    OverlayToModel,
    FormToModel,
}

/// An editable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    ContactNumber,
    Color,
    Visibility,
    Latitude,
    Longitude,
    Radius,
    VertexLatitude(usize),
    VertexLongitude(usize),
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::ContactNumber => "contactNumber",
            FormField::Color => "color",
            FormField::Visibility => "visibility",
            FormField::Latitude => "latitude",
            FormField::Longitude => "longitude",
            FormField::Radius => "radius",
            FormField::VertexLatitude(_) => "vertexLatitude",
            FormField::VertexLongitude(_) => "vertexLongitude",
        }
    }

    /// Parses a field name. Vertex fields need an index.
    pub fn parse(name: &str, index: Option<usize>) -> Option<Self> {
        match (name, index) {
            ("name", _) => Some(FormField::Name),
            ("contactNumber", _) => Some(FormField::ContactNumber),
            ("color", _) => Some(FormField::Color),
            ("visibility", _) => Some(FormField::Visibility),
            ("latitude", _) => Some(FormField::Latitude),
            ("longitude", _) => Some(FormField::Longitude),
            ("radius", _) => Some(FormField::Radius),
            ("vertexLatitude", Some(i)) => Some(FormField::VertexLatitude(i)),
            ("vertexLongitude", Some(i)) => Some(FormField::VertexLongitude(i)),
            _ => None,
        }
    }

    pub fn is_geometry(&self) -> bool {
        !matches!(
            self,
            FormField::Name | FormField::ContactNumber | FormField::Color | FormField::Visibility
        )
    }
}

/// Text of one polygon vertex row in the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexFields {
    pub latitude: String,
    pub longitude: String,
}

/// What the form shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub name: String,
    pub contact_number: String,
    pub color: String,
    pub visibility: Visibility,
    pub address: Option<String>,
    pub shape_type: Option<ShapeType>,
    pub latitude: String,
    pub longitude: String,
    pub radius: String,
    pub vertices: Vec<VertexFields>,
    pub perimeter_meters: f64,
    pub area_square_meters: f64,
}

/// Result of feeding an event into the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The shape changed and was propagated.
    Applied,
    /// The event echoed geometry we wrote ourselves.
    Ignored,
    /// The value matched the current shape.
    Unchanged,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Applied => "applied",
            SyncOutcome::Ignored => "ignored",
            SyncOutcome::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMode {
    Create,
    Update { id: String },
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::Create => "create",
            CommitMode::Update { .. } => "update",
        }
    }
}

/// A validated geofence ready for the persistence collaborator.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub mode: CommitMode,
    pub geofence: Geofence,
    pub payload: GeofencePayload,
}

/// The state machine of one editing session.
#[derive(Debug)]
pub struct GeofenceEditor {
    settings: EditorSettings,
    state: EditState,
    resume_state: EditState,
    metadata: GeofenceMetadata,
    shape: Option<Shape>,
    editing_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    handle: Option<OverlayHandle>,
    last_synced: Option<OverlayGeometry>,
    form: FormState,
    last_error: Option<String>,
}

impl Default for GeofenceEditor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl GeofenceEditor {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            state: EditState::Idle,
            resume_state: EditState::Idle,
            metadata: GeofenceMetadata::default(),
            shape: None,
            editing_id: None,
            created_at: None,
            handle: None,
            last_synced: None,
            form: FormState::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn metadata(&self) -> &GeofenceMetadata {
        &self.metadata
    }

    pub fn metrics(&self) -> ShapeMetrics {
        self.shape.as_ref().map(compute_metrics).unwrap_or_default()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Id of the committed geofence being edited, if any.
    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    pub fn handle(&self) -> Option<OverlayHandle> {
        self.handle
    }

    pub fn active_direction(&self) -> Option<SyncDirection> {
        match self.state {
            EditState::Editing => Some(SyncDirection::OverlayToModel),
            EditState::FormDriven => Some(SyncDirection::FormToModel),
            _ => None,
        }
    }

    /// Starts drawing a new geofence with default geometry at `center`.
    pub fn start_drawing(
        &mut self,
        surface: &mut dyn MapSurface,
        shape_type: ShapeType,
        center: Option<Coordinate>,
    ) -> Result<(), EditorError> {
        self.require_idle("start drawing")?;

        let center = center.unwrap_or(self.settings.default_center);
        center.validate()?;

        self.metadata = GeofenceMetadata {
            color: self.settings.default_color.clone(),
            ..GeofenceMetadata::default()
        };
        self.editing_id = None;
        self.created_at = None;
        self.shape = Some(self.settings.seed(shape_type, center));
        self.attach_overlay(surface);
        self.state = EditState::Drawing;
        self.last_error = None;
        self.sync_form();

        info!(shape_type = %shape_type, lat = center.lat, lng = center.lng, "Drawing started");
        Ok(())
    }

    /// Completes the initial placement of a drawn shape at `at`.
    pub fn place(
        &mut self,
        surface: &mut dyn MapSurface,
        at: Coordinate,
    ) -> Result<(), EditorError> {
        if self.state != EditState::Drawing {
            return Err(self.transition_error("place"));
        }
        if let Err(e) = at.validate() {
            return self.reject(e);
        }

        self.shape = self.shape.as_ref().map(|s| s.recentered(at));
        self.sync_form();
        self.push_to_overlay(surface);
        self.state = EditState::Editing;

        debug!(lat = at.lat, lng = at.lng, "Shape placed");
        Ok(())
    }

    /// Opens a committed geofence for editing.
    pub fn begin_edit(
        &mut self,
        surface: &mut dyn MapSurface,
        geofence: &Geofence,
    ) -> Result<(), EditorError> {
        self.require_idle("edit")?;

        self.metadata = geofence.metadata();
        self.editing_id = Some(geofence.id.clone());
        self.created_at = Some(geofence.created_at);
        self.shape = Some(geofence.shape.clone().into_editable());
        self.attach_overlay(surface);
        self.state = EditState::Editing;
        self.last_error = None;
        self.sync_form();

        info!(geofence_id = %geofence.id, "Editing started");
        Ok(())
    }

    /// Folds a user mutation of the overlay into the shape and the form.
    pub fn apply_overlay_mutation(
        &mut self,
        geometry: OverlayGeometry,
    ) -> Result<SyncOutcome, EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("apply an overlay mutation"));
        }

        if let Some(last) = &self.last_synced {
            if last.approx_eq(&geometry) {
                debug!("Ignoring overlay echo");
                return Ok(SyncOutcome::Ignored);
            }
        }

        let active = self.active_kind();
        if geometry.kind() != active {
            return Err(EditorError::ShapeMismatch {
                reported: geometry.kind(),
                active,
            });
        }

        self.shape = Some(geometry.clone().into_shape());
        self.last_synced = Some(geometry);
        self.state = EditState::Editing;
        self.last_error = None;
        self.sync_form();
        Ok(SyncOutcome::Applied)
    }

    /// Applies a form edit. Geometry fields are pushed back onto the overlay.
    ///
    /// Rejected input leaves the previous value in place.
    pub fn apply_form_edit(
        &mut self,
        surface: &mut dyn MapSurface,
        field: FormField,
        value: &str,
    ) -> Result<SyncOutcome, EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("edit the form"));
        }

        if !field.is_geometry() {
            return self.apply_metadata_edit(field, value);
        }

        let number = match parse_number(value) {
            Some(n) => n,
            None => {
                return self.reject(ValidationError::NonNumericInput {
                    field: field.as_str().to_string(),
                })
            }
        };

        let updated = match self.edited_shape(field, number) {
            Ok(shape) => shape,
            Err(e) => return self.reject(e),
        };

        if self.shape.as_ref().is_some_and(|s| s.approx_eq(&updated)) {
            return Ok(SyncOutcome::Unchanged);
        }

        self.shape = Some(updated);
        self.state = EditState::FormDriven;
        self.last_error = None;
        self.sync_form();
        self.keep_typed_text(field, value.trim());
        self.push_to_overlay(surface);
        Ok(SyncOutcome::Applied)
    }

    /// Inserts a polygon vertex before `index` (or at the end when `index == len`).
    pub fn insert_vertex(
        &mut self,
        surface: &mut dyn MapSurface,
        index: usize,
        coordinate: Coordinate,
    ) -> Result<(), EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("insert a vertex"));
        }
        if let Err(e) = coordinate.validate() {
            return self.reject(e);
        }

        let mut vertices = self.polygon_vertices()?;
        if index > vertices.len() {
            return self.reject(ValidationError::VertexOutOfBounds {
                index,
                len: vertices.len(),
            });
        }
        vertices.insert(index, coordinate);
        self.apply_vertices(surface, vertices);
        Ok(())
    }

    /// Removes a polygon vertex. Dropping below three vertices is allowed
    /// while editing but blocks the commit.
    pub fn remove_vertex(
        &mut self,
        surface: &mut dyn MapSurface,
        index: usize,
    ) -> Result<(), EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("remove a vertex"));
        }

        let mut vertices = self.polygon_vertices()?;
        if index >= vertices.len() {
            return self.reject(ValidationError::VertexOutOfBounds {
                index,
                len: vertices.len(),
            });
        }
        vertices.remove(index);
        self.apply_vertices(surface, vertices);
        Ok(())
    }

    /// Replaces the shape with fresh default geometry of another type,
    /// centered where the previous shape was.
    pub fn switch_shape_type(
        &mut self,
        surface: &mut dyn MapSurface,
        shape_type: ShapeType,
    ) -> Result<(), EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("switch shape type"));
        }
        if self.shape.as_ref().map(Shape::shape_type) == Some(shape_type) {
            return Ok(());
        }

        let center = self
            .shape
            .as_ref()
            .and_then(Shape::anchor)
            .unwrap_or(self.settings.default_center);

        self.release_overlay(surface);
        self.shape = Some(self.settings.seed(shape_type, center));
        self.attach_overlay(surface);
        if self.state != EditState::Drawing {
            self.state = EditState::Editing;
        }
        self.sync_form();

        debug!(shape_type = %shape_type, "Shape type switched");
        Ok(())
    }

    pub fn set_address(&mut self, address: Option<String>) {
        self.metadata.address = address.clone();
        self.form.address = address;
    }

    /// Validates the working geofence and moves to `Committing`.
    ///
    /// On a validation failure the state is left unchanged and the error is
    /// kept for display.
    pub fn commit(&mut self) -> Result<CommitRequest, EditorError> {
        if !self.state.is_active() {
            return Err(self.transition_error("commit"));
        }

        if let Err(e) = self.metadata.check() {
            return self.reject(e);
        }
        let shape = match &self.shape {
            Some(shape) => shape.clone(),
            None => {
                return self.reject(ValidationError::MissingField("shape".to_string()));
            }
        };
        if let Err(e) = shape.validate() {
            return self.reject(e);
        }

        let now = Utc::now();
        let (mode, id) = match &self.editing_id {
            Some(id) => (CommitMode::Update { id: id.clone() }, id.clone()),
            None => (CommitMode::Create, Geofence::placeholder_id(now)),
        };
        let created_at = self.created_at.unwrap_or(now);

        let mut geofence = Geofence::new(id, self.metadata.clone(), shape, created_at);
        if matches!(mode, CommitMode::Update { .. }) {
            geofence.updated_at = Some(now);
        }
        let payload = geofence.to_payload();

        self.resume_state = self.state;
        self.state = EditState::Committing;
        self.last_error = None;

        info!(geofence_id = %geofence.id, mode = mode.as_str(), "Committing geofence");
        Ok(CommitRequest {
            mode,
            geofence,
            payload,
        })
    }

    /// Finishes a commit with the persistence outcome.
    ///
    /// Success releases the overlay and returns to `Idle`; failure returns to
    /// the state the commit started from with the error surfaced.
    pub fn complete_commit(
        &mut self,
        surface: &mut dyn MapSurface,
        outcome: Result<(), PersistenceError>,
    ) -> Result<(), EditorError> {
        if self.state != EditState::Committing {
            return Err(self.transition_error("complete a commit"));
        }

        match outcome {
            Ok(()) => {
                self.release_overlay(surface);
                self.reset();
                Ok(())
            }
            Err(e) => {
                self.state = self.resume_state;
                self.last_error = Some(e.to_string());
                Err(EditorError::Persistence(e))
            }
        }
    }

    /// Abandons the current draw or edit.
    pub fn cancel(&mut self, surface: &mut dyn MapSurface) -> Result<(), EditorError> {
        match self.state {
            EditState::Idle => Ok(()),
            EditState::Committing => Err(self.transition_error("cancel")),
            _ => {
                self.release_overlay(surface);
                self.reset();
                self.last_error = None;
                debug!("Edit cancelled");
                Ok(())
            }
        }
    }

    fn apply_metadata_edit(
        &mut self,
        field: FormField,
        value: &str,
    ) -> Result<SyncOutcome, EditorError> {
        match field {
            FormField::Name => {
                self.metadata.name = value.to_string();
                self.form.name = value.to_string();
            }
            FormField::ContactNumber => {
                self.metadata.contact_number = value.to_string();
                self.form.contact_number = value.to_string();
            }
            FormField::Color => {
                self.metadata.color = value.trim().to_string();
                self.form.color = value.trim().to_string();
            }
            FormField::Visibility => match Visibility::parse(value.trim()) {
                Some(visibility) => {
                    self.metadata.visibility = visibility;
                    self.form.visibility = visibility;
                }
                None => {
                    return self.reject(ValidationError::InvalidField {
                        field: field.as_str().to_string(),
                        message: "must be public or private".to_string(),
                    })
                }
            },
            _ => return Ok(SyncOutcome::Unchanged),
        }
        Ok(SyncOutcome::Applied)
    }

    fn edited_shape(&self, field: FormField, number: f64) -> Result<Shape, ValidationError> {
        let shape = self
            .shape
            .clone()
            .ok_or_else(|| ValidationError::MissingField("shape".to_string()))?;

        match (shape, field) {
            (
                Shape::Circle {
                    center,
                    radius_meters,
                },
                FormField::Latitude | FormField::Longitude,
            ) => {
                let center = if field == FormField::Latitude {
                    Coordinate::new(number, center.lng)
                } else {
                    Coordinate::new(center.lat, number)
                };
                center.validate()?;
                Ok(Shape::circle(center, radius_meters))
            }
            (Shape::Circle { center, .. }, FormField::Radius) => {
                let shape = Shape::circle(center, number);
                shape.validate()?;
                Ok(shape)
            }
            (
                Shape::Polygon { mut vertices },
                FormField::VertexLatitude(index) | FormField::VertexLongitude(index),
            ) => {
                let len = vertices.len();
                let vertex = vertices
                    .get_mut(index)
                    .ok_or(ValidationError::VertexOutOfBounds { index, len })?;
                let moved = match field {
                    FormField::VertexLatitude(_) => Coordinate::new(number, vertex.lng),
                    _ => Coordinate::new(vertex.lat, number),
                };
                moved.validate()?;
                *vertex = moved;
                Ok(Shape::polygon(vertices))
            }
            (shape, field) => Err(ValidationError::InvalidField {
                field: field.as_str().to_string(),
                message: format!("does not apply to a {}", shape.kind()),
            }),
        }
    }

    fn polygon_vertices(&mut self) -> Result<Vec<Coordinate>, EditorError> {
        match &self.shape {
            Some(Shape::Polygon { vertices }) => Ok(vertices.clone()),
            other => {
                let kind = other.as_ref().map(Shape::kind).unwrap_or("nothing");
                self.reject(ValidationError::InvalidField {
                    field: "vertices".to_string(),
                    message: format!("does not apply to a {}", kind),
                })
            }
        }
    }

    fn apply_vertices(&mut self, surface: &mut dyn MapSurface, vertices: Vec<Coordinate>) {
        self.shape = Some(Shape::polygon(vertices));
        self.state = EditState::FormDriven;
        self.last_error = None;
        self.sync_form();
        self.push_to_overlay(surface);
    }

    fn active_kind(&self) -> &'static str {
        self.shape.as_ref().map(Shape::kind).unwrap_or("nothing")
    }

    fn attach_overlay(&mut self, surface: &mut dyn MapSurface) {
        let Some(shape) = &self.shape else {
            return;
        };

        let style = OverlayStyle::editable(&self.metadata.color);
        match render_shape(surface, shape, &style) {
            Ok(handle) => {
                surface.subscribe_mutations(handle);
                self.handle = Some(handle);
            }
            Err(e) => {
                warn!(error = %e, "Map surface unavailable, editing without overlay");
                self.handle = None;
            }
        }
        self.last_synced = Some(OverlayGeometry::from_shape(shape));
    }

    /// Writes the working shape onto the overlay with mutation events muted.
    fn push_to_overlay(&mut self, surface: &mut dyn MapSurface) {
        let Some(shape) = &self.shape else {
            return;
        };
        let geometry = OverlayGeometry::from_shape(shape);

        if let Some(handle) = self.handle {
            surface.suppress_mutations(handle, true);
            let result = surface.update_overlay(handle, &geometry);
            surface.suppress_mutations(handle, false);
            if let Err(e) = result {
                warn!(error = %e, %handle, "Failed to update overlay");
            }
        }
        self.last_synced = Some(geometry);
    }

    fn release_overlay(&mut self, surface: &mut dyn MapSurface) {
        if let Some(handle) = self.handle.take() {
            surface.remove_overlay(handle);
        }
        self.last_synced = None;
    }

    fn sync_form(&mut self) {
        let metrics = self.metrics();
        let form = &mut self.form;

        form.name = self.metadata.name.clone();
        form.contact_number = self.metadata.contact_number.clone();
        form.color = self.metadata.color.clone();
        form.visibility = self.metadata.visibility;
        form.address = self.metadata.address.clone();
        form.perimeter_meters = metrics.perimeter_meters;
        form.area_square_meters = metrics.area_square_meters;

        match &self.shape {
            Some(Shape::Circle {
                center,
                radius_meters,
            }) => {
                form.shape_type = Some(ShapeType::Circle);
                form.latitude = center.lat.to_string();
                form.longitude = center.lng.to_string();
                form.radius = radius_meters.to_string();
                form.vertices.clear();
            }
            Some(shape) => {
                let vertices = match shape.clone().into_editable() {
                    Shape::Polygon { vertices } => vertices,
                    _ => Vec::new(),
                };
                form.shape_type = Some(ShapeType::Polygon);
                form.latitude.clear();
                form.longitude.clear();
                form.radius.clear();
                form.vertices = vertices
                    .iter()
                    .map(|v| VertexFields {
                        latitude: v.lat.to_string(),
                        longitude: v.lng.to_string(),
                    })
                    .collect();
            }
            None => {
                form.shape_type = None;
                form.latitude.clear();
                form.longitude.clear();
                form.radius.clear();
                form.vertices.clear();
            }
        }
    }

    fn keep_typed_text(&mut self, field: FormField, text: &str) {
        let text = text.to_string();
        match field {
            FormField::Latitude => self.form.latitude = text,
            FormField::Longitude => self.form.longitude = text,
            FormField::Radius => self.form.radius = text,
            FormField::VertexLatitude(i) => {
                if let Some(row) = self.form.vertices.get_mut(i) {
                    row.latitude = text;
                }
            }
            FormField::VertexLongitude(i) => {
                if let Some(row) = self.form.vertices.get_mut(i) {
                    row.longitude = text;
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.state = EditState::Idle;
        self.resume_state = EditState::Idle;
        self.metadata = GeofenceMetadata::default();
        self.shape = None;
        self.editing_id = None;
        self.created_at = None;
        self.handle = None;
        self.last_synced = None;
        self.form = FormState::default();
    }

    fn require_idle(&self, action: &'static str) -> Result<(), EditorError> {
        if self.state == EditState::Idle {
            Ok(())
        } else {
            Err(self.transition_error(action))
        }
    }

    fn transition_error(&self, action: &'static str) -> EditorError {
        EditorError::InvalidTransition {
            state: self.state,
            action,
        }
    }

    /// Records a local validation failure and returns it.
    fn reject<T>(&mut self, err: ValidationError) -> Result<T, EditorError> {
        debug!(error = %err, state = %self.state, "Input rejected");
        self.last_error = Some(err.to_string());
        Err(EditorError::Validation(err))
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
