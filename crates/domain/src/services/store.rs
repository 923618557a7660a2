//! Persistence collaborator port.

use std::sync::Mutex;

use chrono::Utc;
use shared::pagination::{PageInfo, PageRequest};

use crate::error::PersistenceError;
use crate::models::geofence::{Geofence, GeofencePayload};

pub use crate::models::geofence::{GeofencePage, SkippedRecord};

/// Storage of committed geofences.
#[async_trait::async_trait]
pub trait GeofenceStore: Send + Sync {
    async fn create_geofence(&self, payload: &GeofencePayload)
        -> Result<Geofence, PersistenceError>;

    async fn update_geofence(
        &self,
        id: &str,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError>;

    async fn delete_geofence(&self, id: &str) -> Result<(), PersistenceError>;

    /// Lists geofences, optionally filtered by a case-insensitive name search.
    ///
    /// Records whose geometry cannot be decoded are reported in
    /// [`GeofencePage::skipped`] rather than failing the whole page.
    async fn list_geofences(
        &self,
        page: &PageRequest,
        search: Option<&str>,
    ) -> Result<GeofencePage, PersistenceError>;
}

/// Mock store for development and testing.
///
/// Keeps decoded geofences in memory and assigns sequential ids.
#[derive(Debug, Default)]
pub struct MockGeofenceStore {
    geofences: Mutex<Vec<Geofence>>,
    next_id: Mutex<u64>,
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockGeofenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store that rejects every call.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn with_geofences(geofences: Vec<Geofence>) -> Self {
        Self {
            geofences: Mutex::new(geofences),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<Geofence> {
        self.geofences
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.simulate_failure {
            return Err(PersistenceError::Unavailable(
                "Simulated failure".to_string(),
            ));
        }
        Ok(())
    }

    fn poisoned() -> PersistenceError {
        PersistenceError::Unavailable("store lock poisoned".to_string())
    }
}

fn invalid_payload(err: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Rejected {
        status: 422,
        message: err.to_string(),
    }
}

#[async_trait::async_trait]
impl GeofenceStore for MockGeofenceStore {
    async fn create_geofence(
        &self,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        self.check()?;

        let id = {
            let mut next = self.next_id.lock().map_err(|_| Self::poisoned())?;
            *next += 1;
            format!("gf-{}", *next)
        };
        let geofence = Geofence::from_payload(id, payload, Utc::now()).map_err(invalid_payload)?;

        self.geofences
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(geofence.clone());
        Ok(geofence)
    }

    async fn update_geofence(
        &self,
        id: &str,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        self.check()?;

        let mut geofences = self.geofences.lock().map_err(|_| Self::poisoned())?;
        let existing = geofences
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;

        let mut updated =
            Geofence::from_payload(id, payload, existing.created_at).map_err(invalid_payload)?;
        updated.updated_at = Some(Utc::now());
        *existing = updated.clone();
        Ok(updated)
    }

    async fn delete_geofence(&self, id: &str) -> Result<(), PersistenceError> {
        self.check()?;

        let mut geofences = self.geofences.lock().map_err(|_| Self::poisoned())?;
        let before = geofences.len();
        geofences.retain(|g| g.id != id);
        if geofences.len() == before {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_geofences(
        &self,
        page: &PageRequest,
        search: Option<&str>,
    ) -> Result<GeofencePage, PersistenceError> {
        self.check()?;

        let geofences = self.geofences.lock().map_err(|_| Self::poisoned())?;
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        let matching: Vec<&Geofence> = geofences
            .iter()
            .filter(|g| needle.is_empty() || g.name.to_lowercase().contains(&needle))
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(GeofencePage {
            geofences: items,
            skipped: Vec::new(),
            pagination: PageInfo::new(page, total),
        })
    }
}
