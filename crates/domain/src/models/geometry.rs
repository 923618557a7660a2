//! Persisted geometry wire format.
//!
//! Stored records carry `geoCodeData: { type: "Feature", geometry: {...} }`,
//! where `geometry.coordinates` changes structure with `geometry.type`:
//!
//! | type      | coordinates                          | radius  |
//! |-----------|--------------------------------------|---------|
//! | Circle    | `[lat, lng]` or `[{lat, lng}]`       | meters  |
//! | Polygon   | `[[lat, lng], ...]`, open ring       | absent  |
//! | Rectangle | `[[neLat, neLng], [swLat, swLng]]`   | absent  |
//!
//! Only `services::codec` interprets these structures.

use serde::{Deserialize, Serialize};

use crate::models::coordinate::Coordinate;

/// GeoJSON feature type tag used by the wrapper.
pub const FEATURE_TYPE: &str = "Feature";

/// Geometry type tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Circle,
    Polygon,
    Rectangle,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Circle => "Circle",
            GeometryType::Polygon => "Polygon",
            GeometryType::Rectangle => "Rectangle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Circle" => Some(GeometryType::Circle),
            "Polygon" => Some(GeometryType::Polygon),
            "Rectangle" => Some(GeometryType::Rectangle),
            _ => None,
        }
    }
}

/// The structural forms a `coordinates` field can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinates {
    /// `[lat, lng]`
    Flat(Vec<f64>),
    /// `[[lat, lng], ...]`
    Nested(Vec<Vec<f64>>),
    /// `[{lat, lng}, ...]`
    Points(Vec<Coordinate>),
}

impl RawCoordinates {
    /// Short structural description for error messages.
    pub fn describe(&self) -> String {
        match self {
            RawCoordinates::Flat(values) => format!("flat array of {} numbers", values.len()),
            RawCoordinates::Nested(pairs) => format!("nested array of {} entries", pairs.len()),
            RawCoordinates::Points(points) => format!("array of {} points", points.len()),
        }
    }
}

/// `geoCodeData.geometry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryPayload {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: RawCoordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// `geoCodeData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: GeometryPayload,
}

impl GeoFeature {
    pub fn new(geometry: GeometryPayload) -> Self {
        Self {
            feature_type: FEATURE_TYPE.to_string(),
            geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_type_round_trip() {
        for t in [
            GeometryType::Circle,
            GeometryType::Polygon,
            GeometryType::Rectangle,
        ] {
            assert_eq!(GeometryType::parse(t.as_str()), Some(t));
        }
        assert_eq!(GeometryType::parse("circle"), None);
        assert_eq!(GeometryType::parse("LineString"), None);
    }

    #[test]
    fn test_raw_coordinates_untagged_forms() {
        let flat: RawCoordinates = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(flat, RawCoordinates::Flat(vec![1.0, 2.0]));

        let nested: RawCoordinates = serde_json::from_str("[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        assert_eq!(
            nested,
            RawCoordinates::Nested(vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        );

        let points: RawCoordinates = serde_json::from_str(r#"[{"lat":1.0,"lng":2.0}]"#).unwrap();
        assert_eq!(
            points,
            RawCoordinates::Points(vec![Coordinate::new(1.0, 2.0)])
        );
    }

    #[test]
    fn test_payload_omits_absent_radius() {
        let payload = GeometryPayload {
            geometry_type: "Polygon".to_string(),
            coordinates: RawCoordinates::Nested(vec![vec![0.0, 0.0]]),
            radius: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"type":"Polygon","coordinates":[[0.0,0.0]]}"#);
    }

    #[test]
    fn test_feature_wrapper() {
        let feature = GeoFeature::new(GeometryPayload {
            geometry_type: "Circle".to_string(),
            coordinates: RawCoordinates::Flat(vec![1.0, 2.0]),
            radius: Some(100.0),
        });
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "Circle");
        assert_eq!(json["geometry"]["radius"], 100.0);
    }
}
