//! Postgres `ShiftStore`.
//!
//! Every transition is
//! `BEGIN; SELECT .. FOR UPDATE OF s; SELECT driver; mutate; UPDATE; COMMIT`.
//! A mutation error drops the transaction, which rolls it back.

use chrono::NaiveDate;
use fw_gates::DEFAULT_GEOFENCE_RADIUS_M;
use fw_schemas::{
    BreakInterval, DriverProfile, EngineError, GeoPoint, Geofence, Shift, ShiftStatus, ShiftType,
    ShiftWithDriver,
};
use fw_shift::{overlap_conflict, ShiftMutation, ShiftStore};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, warn};

const SHIFT_SELECT: &str = r#"
select s.shift_id, s.driver_id, s.vehicle_id, s.shift_type, s.shift_date,
       s.scheduled_start, s.scheduled_end, s.status,
       s.clock_in_at, s.clock_in_lat, s.clock_in_lng,
       s.clock_out_at, s.clock_out_lat, s.clock_out_lng,
       s.odometer_reading, s.online_minutes, s.trip_count, s.total_revenue_cents,
       s.breaks, s.cancel_reason, s.created_at, s.updated_at,
       fin.geofence_id as in_geofence_id, fin.name as in_name,
       fin.center_lat as in_lat, fin.center_lng as in_lng, fin.radius_m as in_radius_m,
       fout.geofence_id as out_geofence_id, fout.name as out_name,
       fout.center_lat as out_lat, fout.center_lng as out_lng, fout.radius_m as out_radius_m
from shifts s
left join geofences fin on fin.geofence_id = s.clock_in_geofence_id
left join geofences fout on fout.geofence_id = s.clock_out_geofence_id
"#;

#[derive(Clone)]
pub struct PgShiftStore {
    pool: PgPool,
}

impl PgShiftStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> EngineError {
    move |e| {
        warn!(op, error = %e, "postgres call failed");
        EngineError::infra(op, e)
    }
}

fn corrupt(field: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::Infrastructure(format!("corrupt stored {field}: {e}"))
}

fn point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}

fn geofence_from_row(row: &PgRow, side: &str) -> Result<Option<Geofence>, sqlx::Error> {
    let id: Option<String> = row.try_get(format!("{side}_geofence_id").as_str())?;
    let Some(geofence_id) = id else {
        return Ok(None);
    };
    let radius: Option<f64> = row.try_get(format!("{side}_radius_m").as_str())?;
    Ok(Some(Geofence {
        geofence_id,
        name: row.try_get(format!("{side}_name").as_str())?,
        center: GeoPoint::new(
            row.try_get(format!("{side}_lat").as_str())?,
            row.try_get(format!("{side}_lng").as_str())?,
        ),
        radius_m: radius.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M),
    }))
}

fn shift_from_row(row: &PgRow) -> Result<Shift, EngineError> {
    let decode = db_err("decode shift row");
    let inner = || -> Result<Shift, sqlx::Error> {
        let shift_type: String = row.try_get("shift_type")?;
        let status: String = row.try_get("status")?;
        let breaks: Json<Vec<BreakInterval>> = row.try_get("breaks")?;
        Ok(Shift {
            shift_id: row.try_get("shift_id")?,
            driver_id: row.try_get("driver_id")?,
            vehicle_id: row.try_get("vehicle_id")?,
            shift_type: ShiftType::parse(&shift_type)
                .map_err(|e| sqlx::Error::Decode(Box::new(corrupt("shift_type", e))))?,
            shift_date: row.try_get("shift_date")?,
            scheduled_start: row.try_get("scheduled_start")?,
            scheduled_end: row.try_get("scheduled_end")?,
            status: ShiftStatus::parse(&status)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            clock_in_at: row.try_get("clock_in_at")?,
            clock_in_location: point(row.try_get("clock_in_lat")?, row.try_get("clock_in_lng")?),
            clock_out_at: row.try_get("clock_out_at")?,
            clock_out_location: point(row.try_get("clock_out_lat")?, row.try_get("clock_out_lng")?),
            odometer_reading: row.try_get("odometer_reading")?,
            online_minutes: row.try_get("online_minutes")?,
            trip_count: row.try_get("trip_count")?,
            total_revenue_cents: row.try_get("total_revenue_cents")?,
            breaks: breaks.0,
            clock_in_geofence: geofence_from_row(row, "in")?,
            clock_out_geofence: geofence_from_row(row, "out")?,
            cancel_reason: row.try_get("cancel_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    };
    inner().map_err(decode)
}

fn driver_from_row(row: &PgRow) -> Result<DriverProfile, EngineError> {
    let inner = || -> Result<DriverProfile, sqlx::Error> {
        Ok(DriverProfile {
            driver_id: row.try_get("d_driver_id")?,
            name: row.try_get("d_name")?,
            bond_balance_cents: row.try_get("d_bond_balance_cents")?,
            bond_required_cents: row.try_get("d_bond_required_cents")?,
        })
    };
    inner().map_err(db_err("decode driver row"))
}

const DRIVER_SELECT: &str = r#"
select driver_id as d_driver_id, name as d_name,
       bond_balance_cents as d_bond_balance_cents,
       bond_required_cents as d_bond_required_cents
from drivers
where driver_id = $1
"#;

async fn driver_in_tx(
    tx: &mut Transaction<'static, Postgres>,
    driver_id: &str,
    lock: bool,
) -> Result<Option<DriverProfile>, EngineError> {
    let sql = if lock {
        format!("{DRIVER_SELECT} for update")
    } else {
        DRIVER_SELECT.to_string()
    };
    let row = sqlx::query(&sql)
        .bind(driver_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err("load driver"))?;
    row.as_ref().map(driver_from_row).transpose()
}

#[async_trait::async_trait]
impl ShiftStore for PgShiftStore {
    async fn driver(&self, driver_id: &str) -> Result<Option<DriverProfile>, EngineError> {
        let row = sqlx::query(DRIVER_SELECT)
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("load driver"))?;
        row.as_ref().map(driver_from_row).transpose()
    }

    async fn geofence(&self, geofence_id: &str) -> Result<Option<Geofence>, EngineError> {
        let row: Option<(String, String, f64, f64, Option<f64>)> = sqlx::query_as(
            r#"
            select geofence_id, name, center_lat, center_lng, radius_m
            from geofences
            where geofence_id = $1
            "#,
        )
        .bind(geofence_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("load geofence"))?;

        Ok(row.map(|(geofence_id, name, lat, lng, radius)| Geofence {
            geofence_id,
            name,
            center: GeoPoint::new(lat, lng),
            radius_m: radius.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M),
        }))
    }

    async fn shift(&self, shift_id: &str) -> Result<Option<Shift>, EngineError> {
        let sql = format!("{SHIFT_SELECT} where s.shift_id = $1");
        let row = sqlx::query(&sql)
            .bind(shift_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("load shift"))?;
        row.as_ref().map(shift_from_row).transpose()
    }

    async fn insert_shift(&self, shift: Shift) -> Result<Shift, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err("begin"))?;

        // Serialises concurrent creates for one driver.
        if driver_in_tx(&mut tx, &shift.driver_id, true).await?.is_none() {
            return Err(EngineError::NotFound(format!("driver {}", shift.driver_id)));
        }

        let overlap: Option<(String, String)> = sqlx::query_as(
            r#"
            select shift_id, status
            from shifts
            where driver_id = $1
              and status in ('SCHEDULED', 'CLOCKED_IN', 'ACTIVE', 'ON_BREAK')
              and scheduled_start < $3
              and $2 < scheduled_end
            order by scheduled_start
            limit 1
            "#,
        )
        .bind(&shift.driver_id)
        .bind(shift.scheduled_start)
        .bind(shift.scheduled_end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("overlap check"))?;

        if let Some((existing_id, status)) = overlap {
            let status = ShiftStatus::parse(&status)?;
            debug!(
                driver_id = %shift.driver_id,
                existing_shift_id = %existing_id,
                "create rolled back: overlapping shift"
            );
            return Err(overlap_conflict(&shift.driver_id, &existing_id, status));
        }

        sqlx::query(
            r#"
            insert into shifts (
              shift_id, driver_id, vehicle_id, shift_type, shift_date,
              scheduled_start, scheduled_end, status, breaks,
              clock_in_geofence_id, clock_out_geofence_id, created_at, updated_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&shift.shift_id)
        .bind(&shift.driver_id)
        .bind(&shift.vehicle_id)
        .bind(shift.shift_type.as_str())
        .bind(shift.shift_date)
        .bind(shift.scheduled_start)
        .bind(shift.scheduled_end)
        .bind(shift.status.as_str())
        .bind(Json(&shift.breaks))
        .bind(shift.clock_in_geofence.as_ref().map(|g| g.geofence_id.as_str()))
        .bind(shift.clock_out_geofence.as_ref().map(|g| g.geofence_id.as_str()))
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("insert shift"))?;

        tx.commit().await.map_err(db_err("commit"))?;
        debug!(shift_id = %shift.shift_id, driver_id = %shift.driver_id, "shift inserted");
        Ok(shift)
    }

    async fn update_shift(
        &self,
        shift_id: &str,
        mutate: ShiftMutation,
    ) -> Result<Shift, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err("begin"))?;

        let sql = format!("{SHIFT_SELECT} where s.shift_id = $1 for update of s");
        let row = sqlx::query(&sql)
            .bind(shift_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("lock shift"))?
            .ok_or_else(|| EngineError::NotFound(format!("shift {shift_id}")))?;
        let mut shift = shift_from_row(&row)?;

        let driver = driver_in_tx(&mut tx, &shift.driver_id, false)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("driver {}", shift.driver_id)))?;

        if let Err(e) = mutate(&mut shift, &driver) {
            debug!(shift_id, error = %e, "transition refused; rolling back");
            return Err(e);
        }

        sqlx::query(
            r#"
            update shifts set
              status = $2,
              clock_in_at = $3, clock_in_lat = $4, clock_in_lng = $5,
              clock_out_at = $6, clock_out_lat = $7, clock_out_lng = $8,
              odometer_reading = $9,
              online_minutes = $10, trip_count = $11, total_revenue_cents = $12,
              breaks = $13, cancel_reason = $14, updated_at = $15
            where shift_id = $1
            "#,
        )
        .bind(&shift.shift_id)
        .bind(shift.status.as_str())
        .bind(shift.clock_in_at)
        .bind(shift.clock_in_location.map(|p| p.lat))
        .bind(shift.clock_in_location.map(|p| p.lng))
        .bind(shift.clock_out_at)
        .bind(shift.clock_out_location.map(|p| p.lat))
        .bind(shift.clock_out_location.map(|p| p.lng))
        .bind(shift.odometer_reading)
        .bind(shift.online_minutes)
        .bind(shift.trip_count)
        .bind(shift.total_revenue_cents)
        .bind(Json(&shift.breaks))
        .bind(&shift.cancel_reason)
        .bind(shift.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("update shift"))?;

        tx.commit().await.map_err(db_err("commit"))?;
        Ok(shift)
    }

    async fn shifts_on(
        &self,
        date: NaiveDate,
        shift_type: Option<ShiftType>,
    ) -> Result<Vec<ShiftWithDriver>, EngineError> {
        let sql = format!(
            r#"
            select q.*, d.driver_id as d_driver_id, d.name as d_name,
                   d.bond_balance_cents as d_bond_balance_cents,
                   d.bond_required_cents as d_bond_required_cents
            from ({SHIFT_SELECT}) q
            join drivers d on d.driver_id = q.driver_id
            where q.shift_date = $1
              and ($2::text is null or q.shift_type = $2)
            order by q.driver_id, q.scheduled_start
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(date)
            .bind(shift_type.map(|t| t.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("load shifts by date"))?;

        rows.iter()
            .map(|row| {
                Ok(ShiftWithDriver {
                    shift: shift_from_row(row)?,
                    driver: driver_from_row(row)?,
                })
            })
            .collect()
    }

    async fn shifts_for_driver(&self, driver_id: &str) -> Result<Vec<Shift>, EngineError> {
        let sql = format!("{SHIFT_SELECT} where s.driver_id = $1 order by s.scheduled_start");
        let rows = sqlx::query(&sql)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("load shifts by driver"))?;
        rows.iter().map(shift_from_row).collect()
    }
}
