//! Scenario: streak expiry and collaborator outages.
//!
//! Paused tokio time drives the counter TTL.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use fw_integrity::TelemetrySample;
use fw_schemas::EngineError;
use fw_testkit::IntegrityHarness;

fn violating(driver_id: &str) -> TelemetrySample {
    TelemetrySample {
        driver_id: driver_id.to_string(),
        speed_kph: 15.0,
        lat: 14.5995,
        lng: 120.9842,
        dashcam_obstructed: true,
        shift_id: None,
        trip_id: Some("T-9".to_string()),
    }
}

fn harness() -> IntegrityHarness {
    IntegrityHarness::new(Utc.with_ymd_and_hms(2025, 3, 1, 1, 0, 0).unwrap())
}

#[tokio::test(start_paused = true)]
async fn sixty_second_gap_expires_the_streak() {
    let h = harness();
    for _ in 0..3 {
        h.monitor.check(violating("D001")).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
    }
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 3);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 0);

    h.monitor.check(violating("D001")).await.unwrap();
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_violation_refreshes_the_ttl() {
    let h = harness();
    for _ in 0..5 {
        h.monitor.check(violating("D001")).await.unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
    }
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 5);
    let out = h.monitor.check(violating("D001")).await.unwrap();
    assert!(out.triggered);
}

#[tokio::test]
async fn counter_outage_is_infrastructure_not_compliance() {
    let h = harness();
    h.counter.set_failing(true);

    let err = h.monitor.check(violating("D001")).await.unwrap_err();
    assert!(matches!(err, EngineError::Infrastructure(_)));
    assert!(err.is_retryable());

    let mut clean = violating("D001");
    clean.dashcam_obstructed = false;
    assert!(matches!(
        h.monitor.check(clean).await,
        Err(EngineError::Infrastructure(_))
    ));
    assert!(h.monitor.violation_count("D001").await.is_err());
    assert!(h.sink.alerts().await.is_empty());
}

#[tokio::test]
async fn sink_outage_after_crossing_still_resets_streak() {
    let h = harness();
    for _ in 0..5 {
        h.monitor.check(violating("D001")).await.unwrap();
    }
    h.sink.set_failing(true);
    let err = h.monitor.check(violating("D001")).await.unwrap_err();
    assert!(matches!(err, EngineError::Infrastructure(_)));
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 0);
    assert!(h.sink.incident_ids().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn lost_reply_on_crossing_is_infrastructure_and_streak_is_gone() {
    let h = harness();
    for _ in 0..5 {
        h.monitor.check(violating("D001")).await.unwrap();
    }

    // The store applies the sixth violation but the reply outlives the timeout.
    h.counter.set_reply_delay(Duration::from_secs(5));
    let err = h.monitor.check(violating("D001")).await.unwrap_err();
    assert!(matches!(err, EngineError::Infrastructure(_)), "{err}");
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(h.sink.alerts().await.is_empty());

    h.counter.set_reply_delay(Duration::ZERO);
    assert_eq!(h.monitor.violation_count("D001").await.unwrap(), 0);
}
