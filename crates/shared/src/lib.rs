//! Shared utilities and common types for the geofence editor workspace.
//!
//! This crate provides common functionality used across all other crates:
//! - Range and format validators for geographic and contact fields
//! - Offset pagination primitives for list endpoints

pub mod pagination;
pub mod validation;
