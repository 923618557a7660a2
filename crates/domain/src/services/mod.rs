//! Geometry engine services and collaborator ports.

pub mod codec;
pub mod console;
pub mod editor;
pub mod geocoder;
pub mod map_surface;
pub mod measurement;
pub mod store;
pub mod workspace;

pub use codec::{decode_geometry, decode_geometry_value, encode_geometry};
pub use console::GeofenceConsole;
pub use editor::{
    CommitMode, CommitRequest, EditState, EditorSettings, FormField, FormState, GeofenceEditor,
    SyncDirection, SyncOutcome,
};
pub use geocoder::{Geocoder, MockGeocoder, NoopGeocoder};
pub use map_surface::{
    MapSurface, OverlayGeometry, OverlayHandle, OverlayStyle, RecordingMapSurface, SurfaceCommand,
};
pub use measurement::{compute_metrics, ShapeMetrics};
pub use store::{GeofenceStore, MockGeofenceStore};
pub use workspace::{GeofenceWorkspace, OverlayRegistry, Snapshot};
