//! In-memory geofence store.
//!
//! Records are kept in their backend wire form so that listings go
//! through the same decoding path as the HTTP store.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::error::PersistenceError;
use domain::models::{Geofence, GeofencePayload};
use domain::services::store::{GeofencePage, GeofenceStore};
use shared::pagination::{PageInfo, PageRequest};

use crate::entities::{decode_records, GeofenceBody, GeofenceEntity};
use crate::error::StoreError;

/// Geofence store for local development and tests.
#[derive(Debug, Default)]
pub struct InMemoryGeofenceStore {
    records: RwLock<Vec<Value>>,
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl InMemoryGeofenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails as if the backend were down.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Stores a raw backend record as-is, without validation.
    pub async fn insert_raw(&self, record: Value) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.simulate_failure {
            return Err(PersistenceError::Unavailable(
                "Simulated failure".to_string(),
            ));
        }
        Ok(())
    }

    fn to_record(
        id: &str,
        payload: &GeofencePayload,
        created_at: &str,
    ) -> Result<Value, StoreError> {
        let mut record = serde_json::to_value(GeofenceBody::from(payload))?;
        if let Value::Object(map) = &mut record {
            map.insert("id".to_string(), Value::String(id.to_string()));
            map.insert("createdAt".to_string(), Value::String(created_at.to_string()));
        }
        Ok(record)
    }

    fn decode(record: Value) -> Result<Geofence, StoreError> {
        let entity: GeofenceEntity = serde_json::from_value(record)?;
        Ok(Geofence::try_from(entity)?)
    }
}

fn record_matches(record: &Value, id: &str) -> bool {
    record.get("id").and_then(Value::as_str) == Some(id)
}

fn name_contains(record: &Value, needle: &str) -> bool {
    record
        .get("name")
        .and_then(Value::as_str)
        .map(|name| name.to_lowercase().contains(needle))
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl GeofenceStore for InMemoryGeofenceStore {
    async fn create_geofence(
        &self,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        self.check()?;

        let id = Uuid::new_v4().to_string();
        let record = Self::to_record(&id, payload, &Utc::now().to_rfc3339())?;
        let geofence = Self::decode(record.clone())?;

        self.records.write().await.push(record);
        Ok(geofence)
    }

    async fn update_geofence(
        &self,
        id: &str,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        self.check()?;

        let mut records = self.records.write().await;
        let existing = records
            .iter_mut()
            .find(|r| record_matches(r, id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let created_at = existing
            .get("createdAt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let mut record = Self::to_record(id, payload, &created_at)?;
        if let Value::Object(map) = &mut record {
            map.insert(
                "updatedAt".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        let geofence = Self::decode(record.clone())?;

        *existing = record;
        Ok(geofence)
    }

    async fn delete_geofence(&self, id: &str) -> Result<(), PersistenceError> {
        self.check()?;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !record_matches(r, id));
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()).into());
        }
        Ok(())
    }

    async fn list_geofences(
        &self,
        page: &PageRequest,
        search: Option<&str>,
    ) -> Result<GeofencePage, PersistenceError> {
        self.check()?;

        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        let records = self.records.read().await;
        let matching: Vec<Value> = records
            .iter()
            .filter(|r| needle.is_empty() || name_contains(r, &needle))
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let window = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .collect();
        let (geofences, skipped) = decode_records(window);

        Ok(GeofencePage {
            geofences,
            skipped,
            pagination: PageInfo::new(page, total),
        })
    }
}
