//! HTTP route handlers.

pub mod geometry;
pub mod health;
pub mod sessions;
