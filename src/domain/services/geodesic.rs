//! Geodesic Distance
//!
//! Pure great-circle distance on the haversine formula. No external
//! dependencies - this is the innermost leaf of the domain.

use crate::domain::value_objects::Coordinates;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two validated points.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Guarded variant over raw values, e.g. coordinates read back from a
/// store. Returns `None` instead of computing garbage when either point
/// is out of range or NaN; callers must treat that as "exclude this
/// candidate", never as zero distance.
pub fn guarded_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Option<f64> {
    let a = Coordinates::new(lat1, lng1)?;
    let b = Coordinates::new(lat2, lng2)?;
    Some(haversine_km(a, b))
}
