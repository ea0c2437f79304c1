//! Canonical test records.
//!
//! Coordinates are the Manila depot used throughout the scenarios; bond
//! figures are centavos.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use fw_gates::EARTH_RADIUS_M;
use fw_schemas::{DriverProfile, GeoPoint, Geofence, Shift, ShiftStatus, ShiftType};
use fw_shift::{default_window, DEFAULT_TIMEZONE};

pub const DEPOT: GeoPoint = GeoPoint {
    lat: 14.5995,
    lng: 120.9842,
};

pub const DEPOT_GEOFENCE_ID: &str = "G-DEPOT";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

pub fn driver(id: &str, name: &str, balance_cents: i64, required_cents: i64) -> DriverProfile {
    DriverProfile {
        driver_id: id.to_string(),
        name: name.to_string(),
        bond_balance_cents: balance_cents,
        bond_required_cents: required_cents,
    }
}

/// D001: bond 5,000.00 of 5,000.00.
pub fn driver_full_bond() -> DriverProfile {
    driver("D001", "Juan Dela Cruz", 500_000, 500_000)
}

/// D002: bond 2,000.00 of 5,000.00 (40%).
pub fn driver_short_bond() -> DriverProfile {
    driver("D002", "Maria Santos", 200_000, 500_000)
}

pub fn manila_depot() -> Geofence {
    Geofence {
        geofence_id: DEPOT_GEOFENCE_ID.to_string(),
        name: "Manila Depot".to_string(),
        center: DEPOT,
        radius_m: 100.0,
    }
}

/// Point `meters` due north of `origin`.
pub fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
    let dlat = (meters / EARTH_RADIUS_M).to_degrees();
    GeoPoint::new(origin.lat + dlat, origin.lng)
}

/// Default window for `shift_type` on `day` in the fleet timezone.
pub fn window(shift_type: ShiftType, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    window_in(shift_type, day, DEFAULT_TIMEZONE)
}

pub fn window_in(shift_type: ShiftType, day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    default_window(shift_type, day, tz).unwrap_or_else(|_| {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        (midnight, midnight + Duration::hours(8))
    })
}

/// A `COMPLETED` shift with the given takings, for read-side views.
pub fn completed_shift(
    shift_id: &str,
    driver_id: &str,
    shift_type: ShiftType,
    day: NaiveDate,
    revenue_cents: i64,
    online_minutes: i64,
    trip_count: i64,
) -> Shift {
    let (start, end) = window(shift_type, day);
    Shift {
        shift_id: shift_id.to_string(),
        driver_id: driver_id.to_string(),
        vehicle_id: format!("V-{driver_id}"),
        shift_type,
        shift_date: day,
        scheduled_start: start,
        scheduled_end: end,
        status: ShiftStatus::Completed,
        clock_in_at: Some(start),
        clock_in_location: Some(DEPOT),
        clock_out_at: Some(start + Duration::minutes(online_minutes)),
        clock_out_location: Some(DEPOT),
        odometer_reading: None,
        online_minutes,
        trip_count,
        total_revenue_cents: revenue_cents,
        breaks: Vec::new(),
        clock_in_geofence: None,
        clock_out_geofence: None,
        cancel_reason: None,
        created_at: start,
        updated_at: start + Duration::minutes(online_minutes),
    }
}
