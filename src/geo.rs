//! Search-area geometry.
//!
//! Planar approximation: a constant number of miles per degree of latitude,
//! and longitude degrees shrinking with `cos(latitude)`. Good enough for
//! radii of a few tens of miles.

use serde::Serialize;

use crate::errors::ConditionsError;
use crate::models::Coordinate;

/// Miles per degree of latitude (and of longitude at the equator).
pub const MILES_PER_DEGREE: f64 = 69.172;

/// Default search radius in miles.
pub const DEFAULT_RADIUS_MILES: f64 = 10.0;

/// Beyond this the longitude offset blows up.
pub const MAX_LATITUDE: f64 = 85.0;

/// Fractional digits kept on each edge for the upstream query string.
const EDGE_DIGITS: usize = 6;

/// Rectangular lat/lon search region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub west: f64,
    pub north: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Box of `radius_miles` around `center`.
    ///
    /// # Errors
    ///
    /// `UnsupportedLatitude` when `|latitude| >= 85`, `InvalidQuery` for
    /// non-finite input or a non-positive radius.
    pub fn around(center: Coordinate, radius_miles: f64) -> Result<Self, ConditionsError> {
        if !center.latitude.is_finite() || !center.longitude.is_finite() {
            return Err(ConditionsError::InvalidQuery(format!(
                "coordinate ({}, {}) is not finite",
                center.latitude, center.longitude
            )));
        }
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return Err(ConditionsError::InvalidQuery(format!(
                "radius must be positive, got {radius_miles}"
            )));
        }
        if center.latitude.abs() >= MAX_LATITUDE {
            return Err(ConditionsError::UnsupportedLatitude(center.latitude));
        }

        let miles_per_degree_lon = center.latitude.to_radians().cos() * MILES_PER_DEGREE;
        let lat_offset = radius_miles / MILES_PER_DEGREE;
        let lon_offset = radius_miles / miles_per_degree_lon;

        Ok(Self {
            west: truncate_fraction(center.longitude - lon_offset, EDGE_DIGITS),
            north: truncate_fraction(center.latitude + lat_offset, EDGE_DIGITS),
            south: truncate_fraction(center.latitude - lat_offset, EDGE_DIGITS),
            east: truncate_fraction(center.longitude + lon_offset, EDGE_DIGITS),
        })
    }

    /// Check if a point is within the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    /// USGS `bBox` value: `west,south,east,north`.
    #[must_use]
    pub fn query_value(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Cut `value` to at most `digits` fractional digits without rounding.
///
/// Works on the decimal text so values like `30.1` do not turn into
/// `30.099999` the way scaling by a power of ten can.
#[must_use]
pub fn truncate_fraction(value: f64, digits: usize) -> f64 {
    let text = value.to_string();
    let Some((whole, fraction)) = text.split_once('.') else {
        return value;
    };
    if fraction.len() <= digits {
        return value;
    }
    format!("{whole}.{}", &fraction[..digits])
        .parse()
        .unwrap_or(value)
}
