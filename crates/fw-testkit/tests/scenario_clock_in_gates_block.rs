//! Scenario: clock-in refused by the presence and bond gates.
//!
//! # Invariant under test
//! A refused clock-in is a `Validation` error naming the concrete figure, and
//! the shift is left exactly as it was (still `SCHEDULED`, no clock-in data).

use chrono::Duration;
use fw_schemas::{EngineError, ShiftStatus, ShiftType};
use fw_shift::{ClockInRequest, CreateShiftRequest};
use fw_testkit::fixtures::{self, DEPOT, DEPOT_GEOFENCE_ID};
use fw_testkit::Harness;

async fn scheduled(h: &Harness, driver_id: &str) -> String {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    h.lifecycle
        .create_shift(CreateShiftRequest {
            driver_id: driver_id.to_string(),
            vehicle_id: "V002".to_string(),
            shift_type: ShiftType::Am,
            scheduled_start: start,
            scheduled_end: None,
            geofence_id: Some(DEPOT_GEOFENCE_ID.to_string()),
        })
        .await
        .unwrap()
        .shift_id
}

async fn harness() -> Harness {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    Harness::seeded(start - Duration::minutes(15)).await
}

async fn assert_untouched(h: &Harness, shift_id: &str) {
    let view = h.lifecycle.get_shift(shift_id).await.unwrap();
    assert_eq!(view.shift.status, ShiftStatus::Scheduled);
    assert_eq!(view.shift.clock_in_at, None);
    assert_eq!(view.shift.clock_in_location, None);
}

#[tokio::test]
async fn insufficient_bond_reports_percentage() {
    let h = harness().await;
    let id = scheduled(&h, "D002").await;

    let err = h
        .lifecycle
        .clock_in(
            &id,
            ClockInRequest {
                lat: DEPOT.lat,
                lng: DEPOT.lng,
                accuracy_m: Some(5.0),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)), "{err}");
    assert!(err.to_string().contains("40.0%"), "{err}");
    assert_untouched(&h, &id).await;
}

#[tokio::test]
async fn point_500m_away_is_outside_100m_fence() {
    let h = harness().await;
    let id = scheduled(&h, "D001").await;
    let away = fixtures::north_of(DEPOT, 500.0);

    let err = h
        .lifecycle
        .clock_in(
            &id,
            ClockInRequest {
                lat: away.lat,
                lng: away.lng,
                accuracy_m: Some(5.0),
            },
        )
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, EngineError::Validation(_)), "{msg}");
    assert!(msg.contains("outside clock-in geofence"), "{msg}");
    assert!(msg.contains("radius 100 m"), "{msg}");
    assert_untouched(&h, &id).await;
}

#[tokio::test]
async fn coarse_gps_fix_is_refused_before_fence_and_bond() {
    let h = harness().await;
    // D002 would also fail the bond gate; accuracy is checked first.
    let id = scheduled(&h, "D002").await;

    let err = h
        .lifecycle
        .clock_in(
            &id,
            ClockInRequest {
                lat: DEPOT.lat,
                lng: DEPOT.lng,
                accuracy_m: Some(75.0),
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("GPS accuracy too low: 75.0 m"), "{err}");
    assert_untouched(&h, &id).await;
}

#[tokio::test]
async fn geofence_is_checked_before_bond() {
    let h = harness().await;
    let id = scheduled(&h, "D002").await;
    let away = fixtures::north_of(DEPOT, 500.0);

    let err = h
        .lifecycle
        .clock_in(
            &id,
            ClockInRequest {
                lat: away.lat,
                lng: away.lng,
                accuracy_m: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("geofence"), "{err}");
    assert!(!err.to_string().contains("bond"), "{err}");
}

#[tokio::test]
async fn out_of_range_coordinates_are_validation() {
    let h = harness().await;
    let id = scheduled(&h, "D001").await;
    let err = h
        .lifecycle
        .clock_in(
            &id,
            ClockInRequest {
                lat: 91.0,
                lng: DEPOT.lng,
                accuracy_m: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)), "{err}");
}

#[tokio::test]
async fn topping_up_bond_unblocks_the_same_shift() {
    let h = harness().await;
    let id = scheduled(&h, "D002").await;
    let at_depot = ClockInRequest {
        lat: DEPOT.lat,
        lng: DEPOT.lng,
        accuracy_m: Some(5.0),
    };
    assert!(h.lifecycle.clock_in(&id, at_depot).await.is_err());

    h.store
        .add_driver(fixtures::driver("D002", "Maria Santos", 500_000, 500_000))
        .await;
    let ci = h.lifecycle.clock_in(&id, at_depot).await.unwrap();
    assert_eq!(ci.shift.status, ShiftStatus::ClockedIn);
}
