//! `GeofenceStore` implementations.

pub mod http;
pub mod memory;

pub use http::HttpGeofenceStore;
pub use memory::InMemoryGeofenceStore;
