//! Conversion between [`Shape`] and the persisted geometry payload.
//!
//! Writes always emit the canonical form for the shape. Reads accept every
//! form existing records are known to use and reject anything else with a
//! [`DecodeError`]; a decoded shape is always valid.

use crate::error::DecodeError;
use crate::models::coordinate::{Coordinate, COORDINATE_EPSILON};
use crate::models::geometry::{GeometryPayload, GeometryType, RawCoordinates};
use crate::models::shape::{Shape, MIN_POLYGON_VERTICES};

/// Encodes a shape into its canonical payload.
///
/// Circles use a flat `[lat, lng]` center plus `radius`; polygons use an open
/// ring of `[lat, lng]` pairs; legacy rectangles keep their `[ne, sw]` corners.
pub fn encode_geometry(shape: &Shape) -> GeometryPayload {
    match shape {
        Shape::Circle {
            center,
            radius_meters,
        } => GeometryPayload {
            geometry_type: GeometryType::Circle.as_str().to_string(),
            coordinates: RawCoordinates::Flat(center.to_pair().to_vec()),
            radius: Some(*radius_meters),
        },
        Shape::Polygon { vertices } => GeometryPayload {
            geometry_type: GeometryType::Polygon.as_str().to_string(),
            coordinates: RawCoordinates::Nested(
                vertices.iter().map(|v| v.to_pair().to_vec()).collect(),
            ),
            radius: None,
        },
        Shape::Rectangle {
            north_east,
            south_west,
        } => GeometryPayload {
            geometry_type: GeometryType::Rectangle.as_str().to_string(),
            coordinates: RawCoordinates::Nested(vec![
                north_east.to_pair().to_vec(),
                south_west.to_pair().to_vec(),
            ]),
            radius: None,
        },
    }
}

/// Decodes a persisted payload into a validated shape.
pub fn decode_geometry(payload: &GeometryPayload) -> Result<Shape, DecodeError> {
    let geometry_type = GeometryType::parse(&payload.geometry_type)
        .ok_or_else(|| DecodeError::UnknownGeometryType(payload.geometry_type.clone()))?;

    let shape = match geometry_type {
        GeometryType::Circle => decode_circle(payload)?,
        GeometryType::Polygon => decode_polygon(&payload.coordinates)?,
        GeometryType::Rectangle => decode_rectangle(&payload.coordinates)?,
    };

    shape.validate()?;
    Ok(shape)
}

/// Decodes a raw `geometry` JSON value, as found inside a stored record.
pub fn decode_geometry_value(value: &serde_json::Value) -> Result<Shape, DecodeError> {
    let payload: GeometryPayload = serde_json::from_value(value.clone())
        .map_err(|e| DecodeError::MalformedCoordinates(e.to_string()))?;
    decode_geometry(&payload)
}

fn decode_circle(payload: &GeometryPayload) -> Result<Shape, DecodeError> {
    let center = match &payload.coordinates {
        RawCoordinates::Flat(values) if values.len() == 2 => {
            Coordinate::new(values[0], values[1])
        }
        RawCoordinates::Points(points) if points.len() == 1 => points[0],
        other => {
            return Err(DecodeError::MalformedCoordinates(format!(
                "circle expects [lat, lng] or a single point, got {}",
                other.describe()
            )))
        }
    };

    let radius = payload.radius.ok_or(DecodeError::MissingRadius)?;
    Ok(Shape::circle(center, radius))
}

fn decode_polygon(coordinates: &RawCoordinates) -> Result<Shape, DecodeError> {
    let mut vertices = match coordinates {
        RawCoordinates::Nested(pairs) => pairs_to_coordinates(pairs)?,
        RawCoordinates::Points(points) => points.clone(),
        RawCoordinates::Flat(values) if values.is_empty() => Vec::new(),
        other => {
            return Err(DecodeError::MalformedCoordinates(format!(
                "polygon expects a list of [lat, lng] pairs, got {}",
                other.describe()
            )))
        }
    };

    // Some writers close the ring explicitly.
    if vertices.len() > MIN_POLYGON_VERTICES {
        if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
            if first.approx_eq(last, COORDINATE_EPSILON) {
                vertices.pop();
            }
        }
    }

    if vertices.len() < MIN_POLYGON_VERTICES {
        return Err(DecodeError::MalformedCoordinates(format!(
            "polygon needs at least {} vertices, got {}",
            MIN_POLYGON_VERTICES,
            vertices.len()
        )));
    }

    Ok(Shape::polygon(vertices))
}

fn decode_rectangle(coordinates: &RawCoordinates) -> Result<Shape, DecodeError> {
    let corners = match coordinates {
        RawCoordinates::Nested(pairs) => pairs_to_coordinates(pairs)?,
        RawCoordinates::Points(points) => points.clone(),
        other => {
            return Err(DecodeError::MalformedCoordinates(format!(
                "rectangle expects two corners, got {}",
                other.describe()
            )))
        }
    };

    match corners.as_slice() {
        [north_east, south_west] => Ok(Shape::Rectangle {
            north_east: *north_east,
            south_west: *south_west,
        }),
        _ => Err(DecodeError::MalformedCoordinates(format!(
            "rectangle expects two corners, got {}",
            corners.len()
        ))),
    }
}

fn pairs_to_coordinates(pairs: &[Vec<f64>]) -> Result<Vec<Coordinate>, DecodeError> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| match pair.as_slice() {
            [lat, lng] => Ok(Coordinate::new(*lat, *lng)),
            _ => Err(DecodeError::MalformedCoordinates(format!(
                "entry {} has {} numbers, expected 2",
                i,
                pair.len()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> GeometryPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_circle_round_trip() {
        let shape = Shape::circle(Coordinate::new(24.8607, 67.0011), 750.5);
        let encoded = encode_geometry(&shape);
        assert_eq!(encoded.geometry_type, "Circle");
        assert_eq!(encoded.radius, Some(750.5));

        let decoded = decode_geometry(&encoded).unwrap();
        assert!(decoded.approx_eq(&shape));
    }

    #[test]
    fn test_polygon_round_trip_through_json() {
        let shape = Shape::polygon(vec![
            Coordinate::new(24.1, 67.1),
            Coordinate::new(24.2, 67.3),
            Coordinate::new(24.0, 67.4),
        ]);
        let json = serde_json::to_value(encode_geometry(&shape)).unwrap();
        assert_eq!(json["coordinates"][1], json!([24.2, 67.3]));
        assert!(json.get("radius").is_none());

        let decoded = decode_geometry(&payload(json)).unwrap();
        assert!(decoded.approx_eq(&shape));
    }

    #[test]
    fn test_decode_circle_point_object_form() {
        let shape = decode_geometry(&payload(json!({
            "type": "Circle",
            "coordinates": [{"lat": 10.0, "lng": 20.0}],
            "radius": 300
        })))
        .unwrap();
        assert_eq!(shape, Shape::circle(Coordinate::new(10.0, 20.0), 300.0));
    }

    #[test]
    fn test_decode_circle_with_four_coordinates_is_malformed() {
        let err = decode_geometry(&payload(json!({
            "type": "Circle",
            "coordinates": [1.0, 2.0, 3.0, 4.0],
            "radius": 100
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }

    #[test]
    fn test_decode_circle_nested_is_malformed() {
        let err = decode_geometry(&payload(json!({
            "type": "Circle",
            "coordinates": [[1.0, 2.0]],
            "radius": 100
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }

    #[test]
    fn test_decode_circle_missing_radius() {
        let err = decode_geometry(&payload(json!({
            "type": "Circle",
            "coordinates": [1.0, 2.0]
        })))
        .unwrap_err();
        assert_eq!(err, DecodeError::MissingRadius);
    }

    #[test]
    fn test_decode_circle_zero_radius_is_invalid() {
        let err = decode_geometry(&payload(json!({
            "type": "Circle",
            "coordinates": [1.0, 2.0],
            "radius": 0
        })))
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidShape(ValidationError::InvalidRadius(0.0))
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = decode_geometry(&payload(json!({
            "type": "LineString",
            "coordinates": [[1.0, 2.0], [3.0, 4.0]]
        })))
        .unwrap_err();
        assert_eq!(err, DecodeError::UnknownGeometryType("LineString".into()));
    }

    #[test]
    fn test_decode_polygon_drops_closing_vertex() {
        let shape = decode_geometry(&payload(json!({
            "type": "Polygon",
            "coordinates": [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]
        })))
        .unwrap();
        let Shape::Polygon { vertices } = shape else {
            panic!("expected polygon");
        };
        assert_eq!(vertices.len(), 3);
    }

    #[test]
    fn test_decode_polygon_rejects_degenerate_closed_ring() {
        let err = decode_geometry(&payload(json!({
            "type": "Polygon",
            "coordinates": [[0.0, 0.0], [0.0, 1.0], [0.0, 0.0]]
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidShape(ValidationError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_decode_polygon_too_few_vertices() {
        let err = decode_geometry(&payload(json!({
            "type": "Polygon",
            "coordinates": [[0.0, 0.0], [0.0, 1.0]]
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }

    #[test]
    fn test_decode_polygon_bad_pair() {
        let err = decode_geometry(&payload(json!({
            "type": "Polygon",
            "coordinates": [[0.0, 0.0], [0.0], [1.0, 1.0]]
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }

    #[test]
    fn test_decode_polygon_out_of_range() {
        let err = decode_geometry(&payload(json!({
            "type": "Polygon",
            "coordinates": [[0.0, 0.0], [95.0, 1.0], [1.0, 1.0]]
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidShape(ValidationError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_decode_rectangle() {
        let shape = decode_geometry(&payload(json!({
            "type": "Rectangle",
            "coordinates": [[2.0, 4.0], [1.0, 3.0]]
        })))
        .unwrap();
        assert_eq!(
            shape,
            Shape::Rectangle {
                north_east: Coordinate::new(2.0, 4.0),
                south_west: Coordinate::new(1.0, 3.0),
            }
        );
        assert_eq!(encode_geometry(&shape).geometry_type, "Rectangle");
    }

    #[test]
    fn test_decode_rectangle_wrong_corner_count() {
        let err = decode_geometry(&payload(json!({
            "type": "Rectangle",
            "coordinates": [[2.0, 4.0], [1.0, 3.0], [0.0, 0.0]]
        })))
        .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }

    #[test]
    fn test_decode_geometry_value_rejects_non_object() {
        let err = decode_geometry_value(&json!("Circle")).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCoordinates(_)));
    }
}
