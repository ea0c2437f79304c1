//! Scenario: roll call for the AM shift after some drivers have arrived.

use chrono::Duration;
use fw_roster::{RollCallStats, RosterViews};
use fw_schemas::ShiftType;
use fw_shift::{ClockInRequest, CreateShiftRequest};
use fw_testkit::fixtures::{self, DEPOT};
use fw_testkit::Harness;

fn am(driver_id: &str) -> CreateShiftRequest {
    let (start, _) = fixtures::window(ShiftType::Am, fixtures::date(2025, 3, 1));
    CreateShiftRequest {
        driver_id: driver_id.to_string(),
        vehicle_id: format!("V-{driver_id}"),
        shift_type: ShiftType::Am,
        scheduled_start: start,
        scheduled_end: None,
        geofence_id: None,
    }
}

const HERE: ClockInRequest = ClockInRequest {
    lat: DEPOT.lat,
    lng: DEPOT.lng,
    accuracy_m: None,
};

#[tokio::test]
async fn roll_call_joins_arrival_and_bond_status() {
    let day = fixtures::date(2025, 3, 1);
    let (start, _) = fixtures::window(ShiftType::Am, day);
    let h = Harness::seeded(start - Duration::minutes(30)).await;
    h.store
        .add_driver(fixtures::driver("D003", "Pedro Reyes", 500_000, 500_000))
        .await;
    h.store
        .add_driver(fixtures::driver("D004", "Ana Lim", 0, 0))
        .await;

    let d003 = h.lifecycle.create_shift(am("D003")).await.unwrap().shift_id;
    let d001 = h.lifecycle.create_shift(am("D001")).await.unwrap().shift_id;
    h.lifecycle.create_shift(am("D002")).await.unwrap();
    let d004 = h.lifecycle.create_shift(am("D004")).await.unwrap().shift_id;
    // A PM shift is not on the AM roll call.
    let mut pm = am("D003");
    pm.shift_type = ShiftType::Pm;
    pm.scheduled_start = fixtures::window(ShiftType::Pm, day).0;
    h.lifecycle.create_shift(pm).await.unwrap();

    // D001 arrives 30 min early; D003 arrives 10 min before start (late for
    // roll call, which expects drivers 20 min early plus 5 grace).
    h.lifecycle.clock_in(&d001, HERE).await.unwrap();
    h.clock.advance(Duration::minutes(20));
    h.lifecycle.clock_in(&d003, HERE).await.unwrap();
    h.lifecycle.cancel(&d004, None).await.unwrap();

    let views = RosterViews::new(h.lifecycle.clone());
    let view = views.get_roll_call(ShiftType::Am, day).await.unwrap();

    let ids: Vec<_> = view.entries.iter().map(|e| e.driver_id.as_str()).collect();
    assert_eq!(ids, ["D001", "D002", "D003"]);

    let d1 = &view.entries[0];
    assert!(d1.arrived_at.is_some());
    assert!(!d1.is_late);
    assert!(d1.can_start);

    let d2 = &view.entries[1];
    assert_eq!(d2.arrived_at, None);
    assert!(!d2.is_late);
    assert!(!d2.can_start);
    assert_eq!(d2.bond_percent.map(|p| format!("{p:.1}")), Some("40.0".to_string()));

    let d3 = &view.entries[2];
    assert!(d3.is_late);
    assert_eq!(d3.driver_name, "Pedro Reyes");

    assert_eq!(
        view.stats,
        RollCallStats {
            total: 3,
            arrived: 2,
            not_arrived: 1,
            eligible: 2,
            blocked: 1,
        }
    );
}
