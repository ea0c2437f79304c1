//! fw-db
//!
//! Postgres-backed [`fw_shift::ShiftStore`] and [`fw_integrity::IncidentSink`]
//! (sqlx), and the Redis-backed [`fw_integrity::ViolationCounter`]
//! (deadpool-redis).
//!
//! Plumbing (connect, migrate, status, seeding) returns `anyhow::Result`; the
//! trait implementations convert every driver failure into
//! `EngineError::Infrastructure` at the engine boundary.

mod counter;
mod incidents;
mod shifts;

pub use counter::RedisViolationCounter;
pub use incidents::PgIncidentSink;
pub use shifts::PgShiftStore;

use std::time::Duration;

use anyhow::{Context, Result};
use fw_schemas::{DriverProfile, Geofence};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "FW_DATABASE_URL";
pub const ENV_REDIS_URL: &str = "FW_REDIS_URL";

/// Connect to Postgres using `FW_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, Duration::from_secs(5)).await
}

pub async fn connect(url: &str, acquire_timeout: Duration) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_shifts_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'shifts'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_shifts_table: exists,
    })
}

/// Shifts still in progress; the CLI refuses to migrate while any exist
/// unless forced.
pub async fn count_live_shifts(pool: &PgPool) -> Result<i64> {
    if !status(pool).await?.has_shifts_table {
        return Ok(0);
    }
    let (n,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint
        from shifts
        where status in ('CLOCKED_IN', 'ACTIVE', 'ON_BREAK')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("count_live_shifts failed")?;
    Ok(n)
}

/// Insert or refresh a driver's bond projection.
pub async fn upsert_driver(pool: &PgPool, driver: &DriverProfile) -> Result<()> {
    sqlx::query(
        r#"
        insert into drivers (driver_id, name, bond_balance_cents, bond_required_cents)
        values ($1, $2, $3, $4)
        on conflict (driver_id) do update
          set name = excluded.name,
              bond_balance_cents = excluded.bond_balance_cents,
              bond_required_cents = excluded.bond_required_cents
        "#,
    )
    .bind(&driver.driver_id)
    .bind(&driver.name)
    .bind(driver.bond_balance_cents)
    .bind(driver.bond_required_cents)
    .execute(pool)
    .await
    .with_context(|| format!("upsert_driver failed: {}", driver.driver_id))?;
    Ok(())
}

pub async fn upsert_geofence(pool: &PgPool, fence: &Geofence) -> Result<()> {
    sqlx::query(
        r#"
        insert into geofences (geofence_id, name, center_lat, center_lng, radius_m)
        values ($1, $2, $3, $4, $5)
        on conflict (geofence_id) do update
          set name = excluded.name,
              center_lat = excluded.center_lat,
              center_lng = excluded.center_lng,
              radius_m = excluded.radius_m
        "#,
    )
    .bind(&fence.geofence_id)
    .bind(&fence.name)
    .bind(fence.center.lat)
    .bind(fence.center.lng)
    .bind(fence.radius_m)
    .execute(pool)
    .await
    .with_context(|| format!("upsert_geofence failed: {}", fence.geofence_id))?;
    Ok(())
}
