use std::sync::Arc;

use chrono::{Duration, Utc};
use fw_schemas::{DriverProfile, EngineError, GeoPoint, Geofence, ShiftStatus, ShiftType, SystemClock};
use fw_shift::{ClockInRequest, ClockOutRequest, CreateShiftRequest, ShiftLifecycle, ShiftStore};
use uuid::Uuid;

/// Full create → clock-in → break → clock-out against Postgres, plus the
/// overlap and double clock-in refusals.
///
/// DB-backed test. Skips if FW_DATABASE_URL is not set.
#[tokio::test]
async fn pg_store_runs_lifecycle_atomically() -> anyhow::Result<()> {
    let url = match std::env::var(fw_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FW_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = fw_db::connect(&url, std::time::Duration::from_secs(5)).await?;
    fw_db::migrate(&pool).await?;

    // Unique ids so leftover rows in a developer DB never collide.
    let tag = Uuid::new_v4().simple().to_string();
    let driver_id = format!("D_{tag}");
    let fence_id = format!("G_{tag}");
    fw_db::upsert_driver(
        &pool,
        &DriverProfile {
            driver_id: driver_id.clone(),
            name: "Test Driver".to_string(),
            bond_balance_cents: 500_000,
            bond_required_cents: 500_000,
        },
    )
    .await?;
    fw_db::upsert_geofence(
        &pool,
        &Geofence {
            geofence_id: fence_id.clone(),
            name: "Depot".to_string(),
            center: GeoPoint::new(14.5995, 120.9842),
            radius_m: 100.0,
        },
    )
    .await?;

    let store: Arc<dyn ShiftStore> = Arc::new(fw_db::PgShiftStore::new(pool.clone()));
    let svc = ShiftLifecycle::new(store, Arc::new(SystemClock));

    let start = Utc::now() - Duration::minutes(10);
    let shift = svc
        .create_shift(CreateShiftRequest {
            driver_id: driver_id.clone(),
            vehicle_id: "V-PG-1".to_string(),
            shift_type: ShiftType::Am,
            scheduled_start: start,
            scheduled_end: Some(start + Duration::hours(8)),
            geofence_id: Some(fence_id.clone()),
        })
        .await?;
    assert_eq!(shift.status, ShiftStatus::Scheduled);
    assert_eq!(shift.clock_in_geofence.as_ref().map(|g| g.radius_m), Some(100.0));

    let overlap = svc
        .create_shift(CreateShiftRequest {
            driver_id: driver_id.clone(),
            vehicle_id: "V-PG-2".to_string(),
            shift_type: ShiftType::Am,
            scheduled_start: start + Duration::hours(1),
            scheduled_end: Some(start + Duration::hours(3)),
            geofence_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(overlap, EngineError::Conflict(_)), "{overlap}");

    let at_depot = ClockInRequest {
        lat: 14.5995,
        lng: 120.9842,
        accuracy_m: Some(8.0),
    };
    let (a, b) = tokio::join!(
        svc.clock_in(&shift.shift_id, at_depot),
        svc.clock_in(&shift.shift_id, at_depot)
    );
    let ok = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(ok, 1, "exactly one concurrent clock-in wins");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(EngineError::Conflict(_))));

    svc.start_break(&shift.shift_id, Some("lunch".to_string())).await?;
    svc.end_break(&shift.shift_id).await?;

    let out = svc
        .clock_out(
            &shift.shift_id,
            ClockOutRequest {
                lat: 14.5995,
                lng: 120.9842,
                accuracy_m: Some(8.0),
                odometer_reading: Some(15_500),
            },
        )
        .await?;
    assert_eq!(out.shift.status, ShiftStatus::Completed);
    assert_eq!(out.shift.odometer_reading, Some(15_500));
    assert_eq!(out.shift.breaks.len(), 1);

    let reread = svc.get_shift(&shift.shift_id).await?;
    assert_eq!(reread.shift, out.shift);
    Ok(())
}
