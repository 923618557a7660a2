//! Geofence shape model.
//!
//! A [`Shape`] is an immutable value: edits produce a new shape. Validity is
//! checked explicitly with [`validate`], so that partially edited geometry
//! (for example a polygon dragged below three vertices) can still be held
//! and measured while the user is working on it.

use geo::{BoundingRect, Centroid, LineString, MultiPoint, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::coordinate::{Coordinate, COORDINATE_EPSILON};
use crate::services::measurement::METERS_PER_DEGREE;

/// Minimum vertex count of a committed polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Shape types a user can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Circle,
    Polygon,
}

impl ShapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Circle => "circle",
            ShapeType::Polygon => "polygon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "circle" => Some(ShapeType::Circle),
            "polygon" => Some(ShapeType::Polygon),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geofence geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shape {
    Circle {
        center: Coordinate,
        #[serde(rename = "radiusMeters")]
        radius_meters: f64,
    },
    /// Vertices in boundary traversal order, without a repeated closing vertex.
    Polygon { vertices: Vec<Coordinate> },
    /// Legacy two-corner bounding box. Read path only.
    Rectangle {
        #[serde(rename = "northEast")]
        north_east: Coordinate,
        #[serde(rename = "southWest")]
        south_west: Coordinate,
    },
}

/// Axis-aligned bounds used to frame geofences on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

/// Validates a shape: radius, vertex count, coordinate ranges, then an
/// explicitly closed polygon ring.
pub fn validate(shape: &Shape) -> Result<(), ValidationError> {
    match shape {
        Shape::Circle {
            center,
            radius_meters,
        } => {
            if shared::validation::validate_radius_meters(*radius_meters).is_err() {
                return Err(ValidationError::InvalidRadius(*radius_meters));
            }
            center.validate()
        }
        Shape::Polygon { vertices } => {
            if vertices.len() < MIN_POLYGON_VERTICES {
                return Err(ValidationError::InsufficientVertices(vertices.len()));
            }
            vertices.iter().try_for_each(Coordinate::validate)?;

            // The ring closes implicitly; decoding drops a repeated first vertex.
            if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
                if first.approx_eq(last, COORDINATE_EPSILON) {
                    return Err(ValidationError::InvalidField {
                        field: "vertices".to_string(),
                        message: "last vertex repeats the first".to_string(),
                    });
                }
            }
            Ok(())
        }
        Shape::Rectangle {
            north_east,
            south_west,
        } => {
            north_east.validate()?;
            south_west.validate()
        }
    }
}

impl Shape {
    pub fn circle(center: Coordinate, radius_meters: f64) -> Self {
        Shape::Circle {
            center,
            radius_meters,
        }
    }

    pub fn polygon(vertices: Vec<Coordinate>) -> Self {
        Shape::Polygon { vertices }
    }

    /// Default polygon seed: a square of `half_span` degrees around `center`,
    /// vertices ordered NW, NE, SE, SW.
    pub fn square_around(center: Coordinate, half_span: f64) -> Self {
        Shape::Polygon {
            vertices: vec![
                center.offset(half_span, -half_span),
                center.offset(half_span, half_span),
                center.offset(-half_span, half_span),
                center.offset(-half_span, -half_span),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self)
    }

    /// Wire-level name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Circle { .. } => "circle",
            Shape::Polygon { .. } => "polygon",
            Shape::Rectangle { .. } => "rectangle",
        }
    }

    /// Drawable type. Rectangles are edited as polygons.
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle { .. } => ShapeType::Circle,
            Shape::Polygon { .. } | Shape::Rectangle { .. } => ShapeType::Polygon,
        }
    }

    /// Converts a legacy rectangle to its 4-vertex polygon (NE, SE, SW, NW).
    /// Other shapes are returned unchanged.
    pub fn into_editable(self) -> Shape {
        match self {
            Shape::Rectangle {
                north_east,
                south_west,
            } => Shape::Polygon {
                vertices: vec![
                    north_east,
                    Coordinate::new(south_west.lat, north_east.lng),
                    south_west,
                    Coordinate::new(north_east.lat, south_west.lng),
                ],
            },
            other => other,
        }
    }

    /// The point a shape is "at": circle center, polygon centroid, rectangle midpoint.
    ///
    /// Polygons use the area centroid when it exists and fall back to the
    /// vertex average for degenerate rings. Returns `None` for an empty polygon.
    pub fn anchor(&self) -> Option<Coordinate> {
        match self {
            Shape::Circle { center, .. } => Some(*center),
            Shape::Polygon { vertices } => polygon_centroid(vertices),
            Shape::Rectangle {
                north_east,
                south_west,
            } => Some(Coordinate::new(
                (north_east.lat + south_west.lat) / 2.0,
                (north_east.lng + south_west.lng) / 2.0,
            )),
        }
    }

    /// Points that must be visible when the map is framed on this shape.
    pub fn bounding_points(&self) -> Vec<Coordinate> {
        match self {
            Shape::Circle {
                center,
                radius_meters,
            } => {
                let d_lat = radius_meters / METERS_PER_DEGREE;
                let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
                let d_lng = (radius_meters / (METERS_PER_DEGREE * cos_lat)).min(180.0);
                vec![
                    clamp(center.offset(d_lat, 0.0)),
                    clamp(center.offset(-d_lat, 0.0)),
                    clamp(center.offset(0.0, d_lng)),
                    clamp(center.offset(0.0, -d_lng)),
                ]
            }
            Shape::Polygon { vertices } => vertices.clone(),
            Shape::Rectangle {
                north_east,
                south_west,
            } => vec![*north_east, *south_west],
        }
    }

    /// Tolerant equality used to recognise geometry that has already been synced.
    pub fn approx_eq(&self, other: &Shape) -> bool {
        match (self, other) {
            (
                Shape::Circle {
                    center: c1,
                    radius_meters: r1,
                },
                Shape::Circle {
                    center: c2,
                    radius_meters: r2,
                },
            ) => c1.approx_eq(c2, COORDINATE_EPSILON) && (r1 - r2).abs() <= COORDINATE_EPSILON,
            (Shape::Polygon { vertices: v1 }, Shape::Polygon { vertices: v2 }) => {
                v1.len() == v2.len()
                    && v1
                        .iter()
                        .zip(v2)
                        .all(|(a, b)| a.approx_eq(b, COORDINATE_EPSILON))
            }
            (
                Shape::Rectangle {
                    north_east: ne1,
                    south_west: sw1,
                },
                Shape::Rectangle {
                    north_east: ne2,
                    south_west: sw2,
                },
            ) => ne1.approx_eq(ne2, COORDINATE_EPSILON) && sw1.approx_eq(sw2, COORDINATE_EPSILON),
            _ => false,
        }
    }

    /// Returns the same shape moved so that its anchor lands on `target`.
    pub fn recentered(&self, target: Coordinate) -> Shape {
        match self.anchor() {
            Some(anchor) => self.translated(target.lat - anchor.lat, target.lng - anchor.lng),
            None => self.clone(),
        }
    }

    /// Returns the same shape moved by the given degree offsets.
    pub fn translated(&self, d_lat: f64, d_lng: f64) -> Shape {
        match self {
            Shape::Circle {
                center,
                radius_meters,
            } => Shape::circle(center.offset(d_lat, d_lng), *radius_meters),
            Shape::Polygon { vertices } => Shape::Polygon {
                vertices: vertices.iter().map(|v| v.offset(d_lat, d_lng)).collect(),
            },
            Shape::Rectangle {
                north_east,
                south_west,
            } => Shape::Rectangle {
                north_east: north_east.offset(d_lat, d_lng),
                south_west: south_west.offset(d_lat, d_lng),
            },
        }
    }
}

/// Bounding box of a set of points, or `None` when empty.
pub fn bounding_box(points: &[Coordinate]) -> Option<BoundingBox> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|c| geo::Point::from(geo::Coord::from(*c)))
        .collect::<Vec<_>>()
        .into();
    multi.bounding_rect().map(|rect| BoundingBox {
        south_west: rect.min().into(),
        north_east: rect.max().into(),
    })
}

fn polygon_centroid(vertices: &[Coordinate]) -> Option<Coordinate> {
    if vertices.is_empty() {
        return None;
    }

    let ring: LineString<f64> = vertices
        .iter()
        .map(|c| geo::Coord::from(*c))
        .collect::<Vec<_>>()
        .into();
    let polygon = Polygon::new(ring, vec![]);

    match polygon.centroid() {
        Some(point) if point.x().is_finite() && point.y().is_finite() => Some(point.into()),
        _ => {
            let n = vertices.len() as f64;
            let (lat, lng) = vertices
                .iter()
                .fold((0.0, 0.0), |(lat, lng), v| (lat + v.lat, lng + v.lng));
            Some(Coordinate::new(lat / n, lng / n))
        }
    }
}

fn clamp(c: Coordinate) -> Coordinate {
    Coordinate::new(c.lat.clamp(-90.0, 90.0), c.lng.clamp(-180.0, 180.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Coordinate> {
        vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.001),
            Coordinate::new(0.001, 0.001),
            Coordinate::new(0.001, 0.0),
        ]
    }

    #[test]
    fn test_validate_rejects_zero_and_negative_radius() {
        let center = Coordinate::new(10.0, 10.0);
        assert_eq!(
            validate(&Shape::circle(center, 0.0)),
            Err(ValidationError::InvalidRadius(0.0))
        );
        assert_eq!(
            validate(&Shape::circle(center, -5.0)),
            Err(ValidationError::InvalidRadius(-5.0))
        );
        assert!(validate(&Shape::circle(center, 0.1)).is_ok());
    }

    #[test]
    fn test_validate_rejects_explicitly_closed_ring() {
        let mut ring = square();
        ring.push(Coordinate::new(0.0, 0.0));
        assert!(matches!(
            validate(&Shape::polygon(ring)),
            Err(ValidationError::InvalidField { ref field, .. }) if field == "vertices"
        ));

        let mut near_closed = square();
        near_closed.push(Coordinate::new(COORDINATE_EPSILON / 2.0, 0.0));
        assert!(validate(&Shape::polygon(near_closed)).is_err());

        assert!(validate(&Shape::polygon(square())).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_polygon() {
        let shape = Shape::polygon(square()[..2].to_vec());
        assert_eq!(
            validate(&shape),
            Err(ValidationError::InsufficientVertices(2))
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_vertex() {
        let mut vertices = square();
        vertices[2] = Coordinate::new(95.0, 0.0);
        assert!(matches!(
            validate(&Shape::polygon(vertices)),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rectangle_corners() {
        let rect = Shape::Rectangle {
            north_east: Coordinate::new(1.0, 1.0),
            south_west: Coordinate::new(0.0, 200.0),
        };
        assert!(matches!(
            validate(&rect),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_shape_type_parse() {
        assert_eq!(ShapeType::parse("circle"), Some(ShapeType::Circle));
        assert_eq!(ShapeType::parse("Polygon"), Some(ShapeType::Polygon));
        assert_eq!(ShapeType::parse("hexagon"), None);
    }

    #[test]
    fn test_rectangle_into_editable() {
        let rect = Shape::Rectangle {
            north_east: Coordinate::new(2.0, 4.0),
            south_west: Coordinate::new(1.0, 3.0),
        };
        assert_eq!(rect.shape_type(), ShapeType::Polygon);
        let Shape::Polygon { vertices } = rect.into_editable() else {
            panic!("expected polygon");
        };
        assert_eq!(
            vertices,
            vec![
                Coordinate::new(2.0, 4.0),
                Coordinate::new(1.0, 4.0),
                Coordinate::new(1.0, 3.0),
                Coordinate::new(2.0, 3.0),
            ]
        );
    }

    #[test]
    fn test_anchor_of_square_is_center() {
        let anchor = Shape::polygon(square()).anchor().unwrap();
        assert!(anchor.approx_eq(&Coordinate::new(0.0005, 0.0005), 1e-12));
    }

    #[test]
    fn test_anchor_of_degenerate_polygon_falls_back_to_average() {
        let shape = Shape::polygon(vec![Coordinate::new(0.0, 0.0), Coordinate::new(2.0, 2.0)]);
        let anchor = shape.anchor().unwrap();
        assert!(anchor.approx_eq(&Coordinate::new(1.0, 1.0), 1e-12));
        assert!(Shape::polygon(vec![]).anchor().is_none());
    }

    #[test]
    fn test_square_around_is_centered() {
        let center = Coordinate::new(24.86, 67.0);
        let shape = Shape::square_around(center, 0.005);
        assert!(shape.anchor().unwrap().approx_eq(&center, 1e-9));
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn test_circle_bounding_points() {
        let shape = Shape::circle(Coordinate::new(0.0, 0.0), METERS_PER_DEGREE);
        let points = shape.bounding_points();
        assert_eq!(points.len(), 4);
        assert!(points[0].approx_eq(&Coordinate::new(1.0, 0.0), 1e-9));
        assert!(points[2].approx_eq(&Coordinate::new(0.0, 1.0), 1e-9));
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(&square()).unwrap();
        assert_eq!(bbox.south_west, Coordinate::new(0.0, 0.0));
        assert_eq!(bbox.north_east, Coordinate::new(0.001, 0.001));
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn test_recentered_polygon_keeps_shape() {
        let shape = Shape::polygon(square());
        let moved = shape.recentered(Coordinate::new(10.0, 20.0));
        assert!(moved
            .anchor()
            .unwrap()
            .approx_eq(&Coordinate::new(10.0, 20.0), 1e-9));
        let Shape::Polygon { vertices } = moved else {
            panic!("expected polygon");
        };
        assert!((vertices[1].lng - vertices[0].lng - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_approx_eq() {
        let a = Shape::circle(Coordinate::new(1.0, 1.0), 100.0);
        let b = Shape::circle(Coordinate::new(1.0 + 1e-12, 1.0), 100.0);
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&Shape::circle(Coordinate::new(1.0, 1.0), 101.0)));
        assert!(!a.approx_eq(&Shape::polygon(square())));
    }

    #[test]
    fn test_shape_serialization() {
        let json = serde_json::to_value(Shape::circle(Coordinate::new(1.0, 2.0), 50.0)).unwrap();
        assert_eq!(json["type"], "circle");
        assert_eq!(json["radiusMeters"], 50.0);
        assert_eq!(json["center"]["lat"], 1.0);

        let shape: Shape = serde_json::from_str(
            r#"{"type":"rectangle","northEast":{"lat":2,"lng":2},"southWest":{"lat":1,"lng":1}}"#,
        )
        .unwrap();
        assert_eq!(shape.kind(), "rectangle");
    }
}
