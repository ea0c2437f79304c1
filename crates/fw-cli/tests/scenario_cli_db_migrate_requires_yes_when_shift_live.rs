use std::sync::Arc;

use assert_cmd::Command;
use chrono::{Duration, Utc};
use fw_schemas::{DriverProfile, ShiftType, SystemClock};
use fw_shift::{ClockInRequest, ClockOutRequest, CreateShiftRequest, ShiftLifecycle};
use predicates::prelude::*;

/// `fw db migrate` must refuse while a shift is clocked in unless --yes.
///
/// DB-backed test, skipped if FW_DATABASE_URL is not set.
#[tokio::test]
async fn cli_db_migrate_requires_yes_when_shift_live() -> anyhow::Result<()> {
    let url = match std::env::var(fw_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: FW_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = fw_db::connect(&url, std::time::Duration::from_secs(5)).await?;
    fw_db::migrate(&pool).await?;

    let driver_id = format!("CLI-{}", Utc::now().timestamp_micros());
    fw_db::upsert_driver(
        &pool,
        &DriverProfile {
            driver_id: driver_id.clone(),
            name: "Migration Guard".to_string(),
            bond_balance_cents: 500_000,
            bond_required_cents: 500_000,
        },
    )
    .await?;

    let lifecycle = ShiftLifecycle::new(
        Arc::new(fw_db::PgShiftStore::new(pool.clone())),
        Arc::new(SystemClock),
    );
    let start = Utc::now() + Duration::minutes(10);
    let shift = lifecycle
        .create_shift(CreateShiftRequest {
            driver_id: driver_id.clone(),
            vehicle_id: "V-CLI".to_string(),
            shift_type: ShiftType::Am,
            scheduled_start: start,
            scheduled_end: Some(start + Duration::hours(8)),
            geofence_id: None,
        })
        .await?;
    lifecycle
        .clock_in(
            &shift.shift_id,
            ClockInRequest {
                lat: 14.5995,
                lng: 120.9842,
                accuracy_m: Some(5.0),
            },
        )
        .await?;

    let mut cmd = Command::cargo_bin("fw")?;
    cmd.env(fw_db::ENV_DB_URL, &url).args(["db", "migrate"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING MIGRATE"));

    let mut cmd2 = Command::cargo_bin("fw")?;
    cmd2.env(fw_db::ENV_DB_URL, &url)
        .args(["db", "migrate", "--yes"]);
    cmd2.assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    // Cleanup: close the shift so later runs see no live shifts from us.
    lifecycle
        .clock_out(
            &shift.shift_id,
            ClockOutRequest {
                lat: 14.5995,
                lng: 120.9842,
                accuracy_m: Some(5.0),
                odometer_reading: None,
            },
        )
        .await?;

    Ok(())
}
