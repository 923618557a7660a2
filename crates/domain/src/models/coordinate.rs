//! Geographic coordinate value type.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tolerance used when comparing coordinates that went through text or JSON.
pub const COORDINATE_EPSILON: f64 = 1e-9;

/// A point on the earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checks `-90 <= lat <= 90` and `-180 <= lng <= 180`. NaN is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        shared::validation::validate_latitude(self.lat)
            .and_then(|_| shared::validation::validate_longitude(self.lng))
            .map_err(|_| ValidationError::CoordinateOutOfRange {
                lat: self.lat,
                lng: self.lng,
            })
    }

    /// Wire form `[lat, lng]`.
    pub fn to_pair(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    pub fn approx_eq(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lng - other.lng).abs() <= tolerance
    }

    /// Returns this coordinate moved by the given degree offsets.
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lng, y: c.lat }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.y, c.x)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Self::new(p.y(), p.x())
    }
}
