// src/geo.rs

use serde::{Deserialize, Serialize};

use crate::common::error::AppError;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Great-circle distance between two points, haversine formula.
///
/// Non-finite input is rejected up front so a NaN never leaks into distance
/// comparisons downstream.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> Result<f64, AppError> {
    if !a.is_finite() || !b.is_finite() {
        return Err(AppError::InvalidCoordinate);
    }

    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Ok(EARTH_RADIUS_KM * c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(39.9042, 116.4074);
        assert_eq!(distance_km(p, p).unwrap(), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(39.9042, 116.4074);
        let b = GeoPoint::new(31.2304, 121.4737);
        let ab = distance_km(a, b).unwrap();
        let ba = distance_km(b, a).unwrap();
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn beijing_to_shanghai_is_about_1070_km() {
        let beijing = GeoPoint::new(39.9042, 116.4074);
        let shanghai = GeoPoint::new(31.2304, 121.4737);
        let d = distance_km(beijing, shanghai).unwrap();
        assert!((d - 1068.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let p = GeoPoint::new(39.9, 116.4);
        let bad = GeoPoint::new(f64::NAN, 116.4);
        assert!(matches!(
            distance_km(p, bad),
            Err(AppError::InvalidCoordinate)
        ));
        let inf = GeoPoint::new(39.9, f64::INFINITY);
        assert!(matches!(
            distance_km(inf, p),
            Err(AppError::InvalidCoordinate)
        ));
    }
}
