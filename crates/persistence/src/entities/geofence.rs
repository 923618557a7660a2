//! Geofence records as stored by the fleet backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use domain::error::DecodeError;
use domain::models::geofence::{GeofenceMetadata, SkippedRecord, DEFAULT_COLOR};
use domain::models::{GeoFeature, Geofence, GeofencePayload, Visibility};
use domain::services::codec::decode_geometry_value;

use crate::metrics::record_decode_failure;

/// `geoCodeData` as read back from the backend.
///
/// The geometry stays untyped so that one malformed record does not
/// fail deserialization of the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCodeData {
    #[serde(rename = "type", default)]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub geometry: Value,
}

/// Geofence record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEntity {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "phoneNumber", default)]
    pub mobile_number: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub shape_type: Option<String>,
    pub geo_code_data: GeoCodeData,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<GeofenceEntity> for Geofence {
    type Error = DecodeError;

    fn try_from(entity: GeofenceEntity) -> Result<Self, Self::Error> {
        let shape = decode_geometry_value(&entity.geo_code_data.geometry)?;
        let visibility = Visibility::from_flags(entity.is_public, entity.is_private)?;

        let metadata = GeofenceMetadata {
            name: entity.name,
            contact_number: entity.mobile_number,
            color: entity
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            visibility,
            address: entity.address.filter(|a| !a.is_empty()),
        };

        let created_at = entity.created_at.unwrap_or_else(Utc::now);
        let mut geofence = Geofence::new(entity.id, metadata, shape, created_at);
        geofence.updated_at = entity.updated_at;
        Ok(geofence)
    }
}

/// Create/update request body sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceBody {
    pub name: String,
    pub mobile_number: String,
    pub is_public: bool,
    pub is_private: bool,
    pub color: String,
    pub shape_type: String,
    pub geo_code_data: GeoFeature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<&GeofencePayload> for GeofenceBody {
    fn from(payload: &GeofencePayload) -> Self {
        let (is_public, is_private) = payload.visibility.flags();
        Self {
            name: payload.name.clone(),
            mobile_number: payload.contact_number.clone(),
            is_public,
            is_private,
            color: payload.color.clone(),
            shape_type: payload.shape_type.as_str().to_string(),
            geo_code_data: GeoFeature::new(payload.geometry.clone()),
            address: payload.address.clone(),
        }
    }
}

/// Decodes raw backend records, keeping the ones that decode and
/// reporting the rest as skipped.
pub fn decode_records(records: Vec<Value>) -> (Vec<Geofence>, Vec<SkippedRecord>) {
    let mut geofences = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        let id = record
            .get("id")
            .or_else(|| record.get("_id"))
            .and_then(record_id);

        let decoded = serde_json::from_value::<GeofenceEntity>(record)
            .map_err(|e| DecodeError::MalformedRecord(e.to_string()))
            .and_then(Geofence::try_from);

        match decoded {
            Ok(geofence) => geofences.push(geofence),
            Err(e) => {
                warn!(geofence_id = ?id, error = %e, "Skipping geofence with undecodable geometry");
                record_decode_failure();
                skipped.push(SkippedRecord {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    (geofences, skipped)
}

fn record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
