use fw_schemas::{Geofence, GeoPoint};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius applied when a geofence record carries no usable radius.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 100.0;

/// Fixes reported with a worse (larger) accuracy than this are refused.
pub const MAX_GPS_ACCURACY_M: f64 = 50.0;

/// Great-circle (haversine) distance in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn within_geofence(point: GeoPoint, center: GeoPoint, radius_m: f64) -> bool {
    distance_meters(point, center) <= radius_m
}

/// Outcome of a geofence membership test, kept for error messages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub radius_m: f64,
}

impl GeofenceCheck {
    pub fn is_inside(&self) -> bool {
        self.distance_m <= self.radius_m
    }
}

/// Measure `point` against `fence`, falling back to the default radius when the
/// stored radius is not a positive finite number.
pub fn check_geofence(point: GeoPoint, fence: &Geofence) -> GeofenceCheck {
    let radius_m = if fence.radius_m.is_finite() && fence.radius_m > 0.0 {
        fence.radius_m
    } else {
        DEFAULT_GEOFENCE_RADIUS_M
    };
    GeofenceCheck {
        distance_m: distance_meters(point, fence.center),
        radius_m,
    }
}

/// `Err(accuracy)` when the reported accuracy is too coarse to trust.
/// A missing accuracy figure is accepted.
pub fn check_accuracy(accuracy_m: Option<f64>) -> Result<(), f64> {
    match accuracy_m {
        Some(a) if !a.is_finite() || a > MAX_GPS_ACCURACY_M => Err(a),
        _ => Ok(()),
    }
}
