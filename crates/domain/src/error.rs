//! Domain error types.

use thiserror::Error;

use crate::services::editor::EditState;

/// Local, recoverable input errors. Always surfaced inline; never abort a session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Radius must be greater than 0 meters (got {0})")]
    InvalidRadius(f64),

    #[error("Polygon needs at least 3 vertices (got {0})")]
    InsufficientVertices(usize),

    #[error("Coordinate out of range: lat {lat}, lng {lng}")]
    CoordinateOutOfRange { lat: f64, lng: f64 },

    #[error("Field {field} must be a number")]
    NonNumericInput { field: String },

    #[error("Field {0} is required")]
    MissingField(String),

    #[error("Field {field} is invalid: {message}")]
    InvalidField { field: String, message: String },

    #[error("Vertex index {index} is out of bounds for {len} vertices")]
    VertexOutOfBounds { index: usize, len: usize },
}

/// Persisted geometry that cannot be turned back into a shape.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("Unknown geometry type: {0}")]
    UnknownGeometryType(String),

    #[error("Malformed coordinates: {0}")]
    MalformedCoordinates(String),

    #[error("Circle geometry is missing its radius")]
    MissingRadius,

    #[error("Decoded shape is invalid: {0}")]
    InvalidShape(#[from] ValidationError),

    #[error("Visibility flags are inconsistent (isPublic={is_public}, isPrivate={is_private})")]
    InconsistentVisibility { is_public: bool, is_private: bool },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

/// Failures of the persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    #[error("Geofence not found: {0}")]
    NotFound(String),

    #[error("Backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Failures of best-effort collaborators. Logged, never fatal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransientCollaboratorError {
    #[error("Reverse geocoding failed: {0}")]
    Geocoding(String),

    #[error("Map surface unavailable: {0}")]
    MapSurface(String),
}

/// Errors returned by the edit synchronization state machine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: EditState, action: &'static str },

    #[error("Overlay reported a {reported} but the active shape is a {active}")]
    ShapeMismatch {
        reported: &'static str,
        active: &'static str,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Unknown geofence: {0}")]
    UnknownGeofence(String),

    #[error("Geofence {0} is being edited")]
    GeofenceBusy(String),
}

impl EditorError {
    /// Whether the error is a user-input problem rather than a collaborator failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, EditorError::Validation(_))
    }
}
