//! Small shared helpers: geodesic distance and location cells.

use crate::directory::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers (haversine).
pub fn haversine_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Coarse grid cell (~1 km) used in proximity throttle keys, so a user
/// walking around the same block does not re-trigger alerts.
pub fn location_cell(point: &GeoPoint) -> String {
    format!("{:.2}:{:.2}", point.latitude, point.longitude)
}

/// Minutes it takes to walk `distance_km` at the given speed.
pub fn walking_minutes(distance_km: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return f64::INFINITY;
    }
    distance_km / speed_kmh * 60.0
}
