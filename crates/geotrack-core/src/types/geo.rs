//! Geodetic points and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Mean Earth radius used by the Haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated WGS-84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in `[-180, 180]`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::validation(format!(
                "Latitude must be between -90 and 90, got {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::validation(format!(
                "Longitude must be between -180 and 180, got {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to `other` in meters.
    ///
    /// `a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)`,
    /// `c = 2 · atan2(√a, √(1−a))`, `d = R · c`.
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair above 1 for antipodal points.
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

/// Round a distance to two decimal places (centimeters).
pub fn round_meters(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let east = GeoPoint::new(0.0, 1.0).unwrap();
        let d = origin.haversine_distance(&east);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_for_same_point() {
        let a = GeoPoint::new(51.5074, -0.1278).unwrap();
        let b = GeoPoint::new(48.8566, 2.3522).unwrap();
        assert_eq!(a.haversine_distance(&a), 0.0);
        let ab = a.haversine_distance(&b);
        let ba = b.haversine_distance(&a);
        assert!((ab - ba).abs() < 1e-6);
        // London to Paris is roughly 343.5 km.
        assert!((ab - 343_500.0).abs() < 2_000.0, "got {ab}");
    }

    #[test]
    fn test_antipodal_points() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 180.0).unwrap();
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((a.haversine_distance(&b) - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(GeoPoint::new(90.0001, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_round_meters() {
        assert_eq!(round_meters(111_194.926_644), 111_194.93);
        assert_eq!(round_meters(0.004), 0.0);
        assert_eq!(round_meters(-3.14159), -3.14);
    }
}
