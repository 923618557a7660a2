//! Reverse geocoding collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::error::TransientCollaboratorError;
use crate::models::coordinate::Coordinate;

/// Best-effort lookup of a street address for a coordinate.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the location has no known address.
    async fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<String>, TransientCollaboratorError>;
}

/// Geocoder used when geocoding is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGeocoder;

#[async_trait::async_trait]
impl Geocoder for NoopGeocoder {
    async fn reverse_geocode(
        &self,
        _coordinate: Coordinate,
    ) -> Result<Option<String>, TransientCollaboratorError> {
        Ok(None)
    }
}

/// Mock geocoder for development and testing.
#[derive(Debug, Default)]
pub struct MockGeocoder {
    pub address: Option<String>,
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    calls: AtomicUsize,
}

impl MockGeocoder {
    /// A geocoder that resolves every coordinate to `address`.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// A geocoder that always fails.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Geocoder for MockGeocoder {
    async fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<String>, TransientCollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(lat = coordinate.lat, lng = coordinate.lng, "[MOCK] Reverse geocoding");

        if self.simulate_failure {
            return Err(TransientCollaboratorError::Geocoding(
                "Simulated failure".to_string(),
            ));
        }
        Ok(self.address.clone())
    }
}
