//! Perimeter and area of geofence shapes.
//!
//! Circles use the Euclidean formulas directly on the ground radius. Polygon
//! perimeters sum haversine edge lengths; polygon areas apply the shoelace
//! formula to raw (lat, lng) degrees and scale by the equatorial
//! meters-per-degree squared. The area is an estimate that degrades away from
//! the equator and for large polygons. It is kept that way so numbers match
//! the ones stored by existing clients.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::models::coordinate::Coordinate;
use crate::models::shape::{Shape, MIN_POLYGON_VERTICES};

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude at the equator.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Derived measurements of a shape. Never authoritative; recompute from the shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeMetrics {
    pub perimeter_meters: f64,
    pub area_square_meters: f64,
}

/// Computes perimeter and area for any shape, including transiently invalid ones.
pub fn compute_metrics(shape: &Shape) -> ShapeMetrics {
    match shape {
        Shape::Circle { radius_meters, .. } => ShapeMetrics {
            perimeter_meters: circle_perimeter(*radius_meters),
            area_square_meters: circle_area(*radius_meters),
        },
        Shape::Polygon { vertices } => ShapeMetrics {
            perimeter_meters: polygon_perimeter(vertices),
            area_square_meters: polygon_area(vertices),
        },
        rectangle @ Shape::Rectangle { .. } => match rectangle.clone().into_editable() {
            Shape::Polygon { vertices } => ShapeMetrics {
                perimeter_meters: polygon_perimeter(&vertices),
                area_square_meters: polygon_area(&vertices),
            },
            _ => ShapeMetrics::default(),
        },
    }
}

pub fn circle_perimeter(radius_meters: f64) -> f64 {
    2.0 * PI * radius_meters.max(0.0)
}

pub fn circle_area(radius_meters: f64) -> f64 {
    let r = radius_meters.max(0.0);
    PI * r * r
}

/// Great-circle distance in meters.
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Sum of haversine edge lengths, wrapping the last vertex back to the first.
///
/// One vertex yields 0; two vertices yield the segment length doubled back.
pub fn polygon_perimeter(vertices: &[Coordinate]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| haversine_distance(&vertices[i], &vertices[(i + 1) % n]))
        .sum()
}

/// Shoelace area in square meters. Fewer than 3 vertices yields exactly 0.
pub fn polygon_area(vertices: &[Coordinate]) -> f64 {
    let n = vertices.len();
    if n < MIN_POLYGON_VERTICES {
        return 0.0;
    }

    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            a.lat * b.lng - b.lat * a.lng
        })
        .sum();

    (twice_area.abs() / 2.0) * METERS_PER_DEGREE * METERS_PER_DEGREE
}
