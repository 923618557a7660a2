//! Domain models for the geofence editor.

pub mod coordinate;
pub mod geofence;
pub mod geometry;
pub mod shape;

pub use coordinate::Coordinate;
pub use geofence::{Geofence, GeofenceMetadata, GeofencePayload, Visibility};
pub use geometry::{GeoFeature, GeometryPayload, GeometryType, RawCoordinates};
pub use shape::{Shape, ShapeType};
