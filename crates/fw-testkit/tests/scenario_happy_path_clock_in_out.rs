//! Scenario: D001 (full bond) works an AM shift at the Manila depot from
//! clock-in to clock-out.
//!
//! All tests are pure in-process; no DB or network required.

use chrono::Duration;
use fw_schemas::{ShiftStatus, ShiftType};
use fw_shift::{ClockInRequest, ClockOutRequest, CreateShiftRequest};
use fw_testkit::fixtures::{self, DEPOT, DEPOT_GEOFENCE_ID};
use fw_testkit::Harness;

fn create_am(driver_id: &str) -> CreateShiftRequest {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    CreateShiftRequest {
        driver_id: driver_id.to_string(),
        vehicle_id: "V001".to_string(),
        shift_type: ShiftType::Am,
        scheduled_start: start,
        scheduled_end: None,
        geofence_id: Some(DEPOT_GEOFENCE_ID.to_string()),
    }
}

const AT_DEPOT: ClockInRequest = ClockInRequest {
    lat: DEPOT.lat,
    lng: DEPOT.lng,
    accuracy_m: Some(5.0),
};

#[tokio::test]
async fn create_clock_in_work_clock_out() {
    let (start, end) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    let h = Harness::seeded(start - Duration::minutes(10)).await;

    let shift = h.lifecycle.create_shift(create_am("D001")).await.unwrap();
    assert_eq!(shift.status, ShiftStatus::Scheduled);
    assert_eq!(shift.shift_date, fixtures::date(2025, 3, 1));
    assert_eq!(shift.scheduled_start, start);
    assert_eq!(shift.scheduled_end, end);
    assert_eq!(
        shift.clock_in_geofence.as_ref().map(|g| g.geofence_id.as_str()),
        Some(DEPOT_GEOFENCE_ID)
    );
    assert_eq!(shift.clock_out_geofence, shift.clock_in_geofence);

    let ci = h.lifecycle.clock_in(&shift.shift_id, AT_DEPOT).await.unwrap();
    assert_eq!(ci.shift.status, ShiftStatus::ClockedIn);
    assert!(!ci.lateness.is_late);
    assert_eq!(ci.shift.clock_in_location, Some(DEPOT));

    let active = h.lifecycle.begin_work(&shift.shift_id).await.unwrap();
    assert_eq!(active.status, ShiftStatus::Active);

    h.lifecycle.record_trip(&shift.shift_id, 25_000).await.unwrap();
    let after_trips = h.lifecycle.record_trip(&shift.shift_id, 17_550).await.unwrap();
    assert_eq!(after_trips.trip_count, 2);
    assert_eq!(after_trips.total_revenue_cents, 42_550);
    assert_eq!(after_trips.status, ShiftStatus::Active);

    h.clock.advance(Duration::minutes(490));
    let out = h
        .lifecycle
        .clock_out(
            &shift.shift_id,
            ClockOutRequest {
                lat: DEPOT.lat,
                lng: DEPOT.lng,
                accuracy_m: Some(5.0),
                odometer_reading: Some(15_500),
            },
        )
        .await
        .unwrap();

    assert_eq!(out.shift.status, ShiftStatus::Completed);
    assert_eq!(out.shift.odometer_reading, Some(15_500));
    assert_eq!(out.shift.online_minutes, 490);
    assert_eq!(out.metrics.worked_minutes, 490);
    assert_eq!(out.metrics.scheduled_minutes, 480);
    assert!(!out.metrics.is_underworking);
    assert!(!out.metrics.clock_anomaly);

    let view = h.lifecycle.get_shift(&shift.shift_id).await.unwrap();
    assert_eq!(view.shift, out.shift);
    assert_eq!(view.metrics, out.metrics);
}

#[tokio::test]
async fn arrival_after_grace_is_reported_late() {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    let h = Harness::seeded(start).await;
    let shift = h.lifecycle.create_shift(create_am("D001")).await.unwrap();

    h.clock.advance(Duration::minutes(12));
    let ci = h.lifecycle.clock_in(&shift.shift_id, AT_DEPOT).await.unwrap();
    assert!(ci.lateness.is_late);
    assert_eq!(ci.lateness.minutes_late, 12);

    let view = h.lifecycle.get_shift(&shift.shift_id).await.unwrap();
    assert_eq!(view.metrics.lateness, ci.lateness);
}

#[tokio::test]
async fn short_shift_is_underworking() {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    let h = Harness::seeded(start).await;
    let shift = h.lifecycle.create_shift(create_am("D001")).await.unwrap();
    h.lifecycle.clock_in(&shift.shift_id, AT_DEPOT).await.unwrap();

    // 431 of 480 scheduled minutes is just under 90%.
    h.clock.advance(Duration::minutes(431));
    let out = h
        .lifecycle
        .clock_out(
            &shift.shift_id,
            ClockOutRequest {
                lat: DEPOT.lat,
                lng: DEPOT.lng,
                accuracy_m: None,
                odometer_reading: None,
            },
        )
        .await
        .unwrap();
    assert!(out.metrics.is_underworking);
    assert_eq!(out.shift.odometer_reading, None);
}
