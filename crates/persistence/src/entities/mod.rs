//! Wire entities of the fleet backend.

pub mod geofence;

pub use geofence::{decode_records, GeoCodeData, GeofenceBody, GeofenceEntity};
