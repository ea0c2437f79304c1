//! fw-gates
//!
//! Presence and bond gates for shift transitions:
//! - Great-circle distance + geofence membership
//! - GPS accuracy floor
//! - Security-bond sufficiency
//!
//! Deterministic, pure logic. No IO, no clock.

mod bond;
mod geo;

pub use bond::{can_start_shift, check_bond, BondGate};
pub use geo::{
    check_accuracy, check_geofence, distance_meters, within_geofence, GeofenceCheck,
    DEFAULT_GEOFENCE_RADIUS_M, EARTH_RADIUS_M, MAX_GPS_ACCURACY_M,
};
