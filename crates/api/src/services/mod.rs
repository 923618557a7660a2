//! Application services.

pub mod geocoding;
pub mod sessions;
