//! Great-circle distance between coordinates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate after range validation.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Checks both components are finite and within their ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let valid = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if valid {
            Ok(())
        } else {
            Err(ValidationError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Haversine distance in meters between two coordinates.
///
/// Accurate to a few meters at the sub-5 km range geofencing works in.
pub fn distance(a: Coordinate, b: Coordinate) -> Result<f64, ValidationError> {
    a.validate()?;
    b.validate()?;

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();
    Ok(EARTH_RADIUS_METERS * central_angle)
}

/// Returns a coordinate `meters` north of `origin`. Used to build fixtures.
#[must_use]
pub fn offset_north(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate {
        latitude: origin.latitude + (meters / EARTH_RADIUS_METERS).to_degrees(),
        longitude: origin.longitude,
    }
}
