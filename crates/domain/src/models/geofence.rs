//! Geofence aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::pagination::PageInfo;
use validator::Validate;

use crate::error::{DecodeError, ValidationError};
use crate::models::geometry::GeometryPayload;
use crate::models::shape::{Shape, ShapeType};
use crate::services::codec::{decode_geometry, encode_geometry};
use crate::services::measurement::{compute_metrics, ShapeMetrics};

/// Fill/stroke color given to new geofences.
pub const DEFAULT_COLOR: &str = "#FF0000";

/// Who can see a geofence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    /// Wire flags `(isPublic, isPrivate)`. Exactly one is true.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            Visibility::Public => (true, false),
            Visibility::Private => (false, true),
        }
    }

    /// Reads the two-boolean wire encoding.
    pub fn from_flags(is_public: bool, is_private: bool) -> Result<Self, DecodeError> {
        match (is_public, is_private) {
            (true, false) => Ok(Visibility::Public),
            (false, true) => Ok(Visibility::Private),
            _ => Err(DecodeError::InconsistentVisibility {
                is_public,
                is_private,
            }),
        }
    }
}

/// User-entered metadata of a geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceMetadata {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_contact_number"))]
    pub contact_number: String,

    #[validate(custom(function = "shared::validation::validate_hex_color"))]
    pub color: String,

    pub visibility: Visibility,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for GeofenceMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            contact_number: String::new(),
            color: DEFAULT_COLOR.to_string(),
            visibility: Visibility::default(),
            address: None,
        }
    }
}

impl GeofenceMetadata {
    /// Required-field and format checks run before a commit.
    pub fn check(&self) -> Result<(), ValidationError> {
        if shared::validation::validate_not_blank(&self.name).is_err() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        if shared::validation::validate_not_blank(&self.contact_number).is_err() {
            return Err(ValidationError::MissingField("contactNumber".to_string()));
        }

        self.validate().map_err(|errors| {
            let (field, message) = errors
                .field_errors()
                .iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| {
                        (
                            field.to_string(),
                            e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                        )
                    })
                })
                .next()
                .unwrap_or_default();
            ValidationError::InvalidField {
                field: to_camel_case(&field),
                message,
            }
        })
    }
}

/// A geofence as known to the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub id: String,
    pub name: String,
    pub contact_number: String,
    pub shape_type: ShapeType,
    pub visibility: Visibility,
    pub shape: Shape,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub perimeter_meters: f64,
    pub area_square_meters: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Geofence {
    /// Builds a geofence and derives its metrics from `shape`.
    pub fn new(
        id: impl Into<String>,
        metadata: GeofenceMetadata,
        shape: Shape,
        created_at: DateTime<Utc>,
    ) -> Self {
        let metrics = compute_metrics(&shape);
        Self {
            id: id.into(),
            name: metadata.name,
            contact_number: metadata.contact_number,
            shape_type: shape.shape_type(),
            visibility: metadata.visibility,
            shape,
            color: metadata.color,
            address: metadata.address,
            perimeter_meters: metrics.perimeter_meters,
            area_square_meters: metrics.area_square_meters,
            created_at,
            updated_at: None,
        }
    }

    /// Client-side id used until persistence assigns the real one.
    pub fn placeholder_id(now: DateTime<Utc>) -> String {
        now.timestamp_millis().to_string()
    }

    pub fn metrics(&self) -> ShapeMetrics {
        ShapeMetrics {
            perimeter_meters: self.perimeter_meters,
            area_square_meters: self.area_square_meters,
        }
    }

    pub fn refresh_metrics(&mut self) {
        let metrics = compute_metrics(&self.shape);
        self.perimeter_meters = metrics.perimeter_meters;
        self.area_square_meters = metrics.area_square_meters;
    }

    /// Rebuilds a geofence from what was sent to persistence.
    pub fn from_payload(
        id: impl Into<String>,
        payload: &GeofencePayload,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DecodeError> {
        let shape = decode_geometry(&payload.geometry)?;
        let metadata = GeofenceMetadata {
            name: payload.name.clone(),
            contact_number: payload.contact_number.clone(),
            color: payload.color.clone(),
            visibility: payload.visibility,
            address: payload.address.clone(),
        };
        Ok(Self::new(id, metadata, shape, created_at))
    }

    /// Create/update body for the persistence collaborator.
    pub fn to_payload(&self) -> GeofencePayload {
        GeofencePayload {
            name: self.name.clone(),
            contact_number: self.contact_number.clone(),
            color: self.color.clone(),
            visibility: self.visibility,
            shape_type: self.shape_type,
            geometry: encode_geometry(&self.shape),
            address: self.address.clone(),
        }
    }

    pub fn metadata(&self) -> GeofenceMetadata {
        GeofenceMetadata {
            name: self.name.clone(),
            contact_number: self.contact_number.clone(),
            color: self.color.clone(),
            visibility: self.visibility,
            address: self.address.clone(),
        }
    }
}

/// What is handed to the persistence collaborator on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofencePayload {
    pub name: String,
    pub contact_number: String,
    pub color: String,
    pub visibility: Visibility,
    pub shape_type: ShapeType,
    pub geometry: GeometryPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A persisted record that could not be decoded and was left out of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub id: Option<String>,
    pub reason: String,
}

/// One page of geofences from the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofencePage {
    pub geofences: Vec<Geofence>,
    pub skipped: Vec<SkippedRecord>,
    pub pagination: PageInfo,
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
