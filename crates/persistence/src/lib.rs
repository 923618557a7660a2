//! Persistence layer for the geofence editor.
//!
//! This crate contains:
//! - The HTTP client of the fleet backend
//! - Entity definitions (backend geofence records and request bodies)
//! - `GeofenceStore` implementations (HTTP and in-memory)

pub mod client;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use client::BackendConfig;
pub use error::StoreError;
pub use repositories::{HttpGeofenceStore, InMemoryGeofenceStore};
