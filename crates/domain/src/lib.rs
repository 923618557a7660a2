//! Domain layer for the geofence editor.
//!
//! This crate contains:
//! - Geometry models (Coordinate, Shape, Geofence, wire payloads)
//! - The geometry engine: measurement, payload codec, edit synchronization
//! - Collaborator ports (map surface, geocoder, geofence store)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
