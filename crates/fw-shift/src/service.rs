//! `ShiftLifecycle` — the transition surface callers use.
//!
//! # Invariants
//!
//! - **One atomic unit per call**: every transition is a single
//!   [`ShiftStore::update_shift`] whose mutation checks the current status,
//!   then the gates, then applies the event. A failure anywhere leaves the
//!   stored shift unchanged.
//! - **Precondition order for clock-in**: existence, status, GPS accuracy,
//!   clock-in geofence, bond. The first failure wins.
//! - **Timeouts are infrastructure**: every store call is bounded by
//!   `io_timeout`; expiry surfaces as `EngineError::Infrastructure`, never as a
//!   gate decision.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fw_gates::{check_accuracy, check_bond, check_geofence, BondGate, MAX_GPS_ACCURACY_M};
use fw_schemas::{EngineError, Geofence, GeoPoint, Shift, ShiftStatus, ShiftType};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::{lateness, Lateness, ShiftMetrics};
use crate::state_machine::{apply, check_transition, trip_totals, EventKind, ShiftEvent};
use crate::store::{ShiftMutation, ShiftStore};
use crate::windows::{default_window, shift_date_for, DEFAULT_TIMEZONE};
use crate::Clock;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Requests / outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShiftRequest {
    pub driver_id: String,
    pub vehicle_id: String,
    pub shift_type: ShiftType,
    pub scheduled_start: DateTime<Utc>,
    /// When absent the whole window is derived from `shift_type` on the
    /// local date of `scheduled_start`.
    #[serde(default)]
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Attached as both the clock-in and clock-out geofence.
    #[serde(default)]
    pub geofence_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockInRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockOutRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub odometer_reading: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockInOutcome {
    pub shift: Shift,
    pub lateness: Lateness,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockOutOutcome {
    pub shift: Shift,
    pub metrics: ShiftMetrics,
}

/// A shift with its read-time projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftView {
    pub shift: Shift,
    pub metrics: ShiftMetrics,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ShiftLifecycle {
    store: Arc<dyn ShiftStore>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    io_timeout: Duration,
}

impl ShiftLifecycle {
    pub fn new(store: Arc<dyn ShiftStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            tz: DEFAULT_TIMEZONE,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn store(&self) -> &Arc<dyn ShiftStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Bound a store call by the caller-imposed timeout.
    pub(crate) async fn io<T, F>(&self, op: &'static str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                let timeout_ms = self.io_timeout.as_millis() as u64;
                warn!(op, timeout_ms, "store call timed out");
                Err(EngineError::Infrastructure(format!(
                    "{op} timed out after {timeout_ms} ms"
                )))
            }
        }
    }

    async fn transition(
        &self,
        shift_id: &str,
        op: EventKind,
        mutate: ShiftMutation,
    ) -> Result<Shift, EngineError> {
        let res = self
            .io(op.as_str(), self.store.update_shift(shift_id, mutate))
            .await;
        match &res {
            Ok(s) => info!(
                shift_id,
                driver_id = %s.driver_id,
                status = s.status.as_str(),
                op = op.as_str(),
                "shift transition"
            ),
            Err(e) => warn!(
                shift_id,
                op = op.as_str(),
                code = e.code(),
                error = %e,
                "shift transition refused"
            ),
        }
        res
    }

    /// Transition driven by a payload-free event (no gates).
    async fn plain(&self, shift_id: &str, event: ShiftEvent) -> Result<Shift, EngineError> {
        let now = self.clock.now();
        let kind = event.kind();
        self.transition(
            shift_id,
            kind,
            Box::new(move |shift, _driver| {
                apply(shift, event, now)?;
                Ok(())
            }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    pub async fn create_shift(&self, req: CreateShiftRequest) -> Result<Shift, EngineError> {
        if req.vehicle_id.trim().is_empty() {
            return Err(EngineError::Validation("vehicle id is required".to_string()));
        }

        let shift_date = shift_date_for(req.shift_type, req.scheduled_start, self.tz);
        let (scheduled_start, scheduled_end) = match req.scheduled_end {
            Some(end) => (req.scheduled_start, end),
            None => default_window(req.shift_type, shift_date, self.tz)?,
        };
        if scheduled_end <= scheduled_start {
            return Err(EngineError::Validation(format!(
                "scheduled end {scheduled_end} is not after scheduled start {scheduled_start}"
            )));
        }

        let driver = self.io("load_driver", self.store.driver(&req.driver_id)).await?;
        if driver.is_none() {
            return Err(EngineError::NotFound(format!("driver {}", req.driver_id)));
        }

        let geofence: Option<Geofence> = match &req.geofence_id {
            Some(id) => Some(
                self.io("load_geofence", self.store.geofence(id))
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("geofence {id}")))?,
            ),
            None => None,
        };

        let now = self.clock.now();
        let shift = Shift {
            shift_id: Uuid::new_v4().to_string(),
            driver_id: req.driver_id,
            vehicle_id: req.vehicle_id.trim().to_string(),
            shift_type: req.shift_type,
            shift_date,
            scheduled_start,
            scheduled_end,
            status: ShiftStatus::Scheduled,
            clock_in_at: None,
            clock_in_location: None,
            clock_out_at: None,
            clock_out_location: None,
            odometer_reading: None,
            online_minutes: 0,
            trip_count: 0,
            total_revenue_cents: 0,
            breaks: Vec::new(),
            clock_in_geofence: geofence.clone(),
            clock_out_geofence: geofence,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };

        let res = self.io("insert_shift", self.store.insert_shift(shift)).await;
        match &res {
            Ok(s) => info!(
                shift_id = %s.shift_id,
                driver_id = %s.driver_id,
                shift_type = s.shift_type.as_str(),
                shift_date = %s.shift_date,
                "shift created"
            ),
            Err(e) => warn!(code = e.code(), error = %e, "shift create refused"),
        }
        res
    }

    // -----------------------------------------------------------------------
    // clock-in
    // -----------------------------------------------------------------------

    pub async fn clock_in(
        &self,
        shift_id: &str,
        req: ClockInRequest,
    ) -> Result<ClockInOutcome, EngineError> {
        let now = self.clock.now();
        let mutate: ShiftMutation = Box::new(move |shift, driver| {
            check_transition(shift.status, EventKind::ClockIn)?;

            if let Err(acc) = check_accuracy(req.accuracy_m) {
                return Err(EngineError::Validation(format!(
                    "GPS accuracy too low: {acc:.1} m (max {MAX_GPS_ACCURACY_M:.0} m)"
                )));
            }
            let location = location(req.lat, req.lng)?;

            if let Some(fence) = &shift.clock_in_geofence {
                ensure_inside(location, fence, "clock-in")?;
            }

            if let BondGate::Blocked { percent } =
                check_bond(driver.bond_balance_cents, driver.bond_required_cents)
            {
                return Err(EngineError::Validation(format!(
                    "insufficient security bond: {percent:.1}% of required (100% needed)"
                )));
            }

            apply(shift, ShiftEvent::ClockIn { location }, now)?;
            Ok(())
        });

        let shift = self.transition(shift_id, EventKind::ClockIn, mutate).await?;
        let lateness = lateness(shift.scheduled_start, now);
        if lateness.is_late {
            info!(
                shift_id,
                driver_id = %shift.driver_id,
                minutes_late = lateness.minutes_late,
                "late clock-in"
            );
        }
        Ok(ClockInOutcome { shift, lateness })
    }

    // -----------------------------------------------------------------------
    // begin work / breaks
    // -----------------------------------------------------------------------

    pub async fn begin_work(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.plain(shift_id, ShiftEvent::BeginWork).await
    }

    pub async fn start_break(
        &self,
        shift_id: &str,
        reason: Option<String>,
    ) -> Result<Shift, EngineError> {
        self.plain(shift_id, ShiftEvent::StartBreak { reason }).await
    }

    pub async fn end_break(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.plain(shift_id, ShiftEvent::EndBreak).await
    }

    // -----------------------------------------------------------------------
    // clock-out
    // -----------------------------------------------------------------------

    pub async fn clock_out(
        &self,
        shift_id: &str,
        req: ClockOutRequest,
    ) -> Result<ClockOutOutcome, EngineError> {
        let now = self.clock.now();
        let mutate: ShiftMutation = Box::new(move |shift, _driver| {
            check_transition(shift.status, EventKind::ClockOut)?;

            let location = location(req.lat, req.lng)?;
            if let Some(fence) = &shift.clock_out_geofence {
                // A coarse fix cannot prove presence inside a fence.
                if let Err(acc) = check_accuracy(req.accuracy_m) {
                    return Err(EngineError::Validation(format!(
                        "GPS accuracy too low: {acc:.1} m (max {MAX_GPS_ACCURACY_M:.0} m)"
                    )));
                }
                ensure_inside(location, fence, "clock-out")?;
            }
            if let Some(odo) = req.odometer_reading {
                if odo < 0 {
                    return Err(EngineError::Validation(format!(
                        "odometer reading must not be negative (got {odo})"
                    )));
                }
            }

            apply(
                shift,
                ShiftEvent::ClockOut {
                    location,
                    odometer_reading: req.odometer_reading,
                },
                now,
            )?;
            Ok(())
        });

        let shift = self.transition(shift_id, EventKind::ClockOut, mutate).await?;
        let metrics = ShiftMetrics::derive(&shift, now);
        if metrics.clock_anomaly {
            warn!(
                shift_id,
                scheduled_start = %shift.scheduled_start,
                scheduled_end = %shift.scheduled_end,
                clock_in_at = ?shift.clock_in_at,
                clock_out_at = ?shift.clock_out_at,
                "negative duration clamped at clock-out; check clock skew"
            );
        }
        if metrics.is_underworking {
            info!(
                shift_id,
                driver_id = %shift.driver_id,
                worked_minutes = metrics.worked_minutes,
                scheduled_minutes = metrics.scheduled_minutes,
                "underworking shift"
            );
        }
        Ok(ClockOutOutcome { shift, metrics })
    }

    // -----------------------------------------------------------------------
    // cancel / no-show / trips
    // -----------------------------------------------------------------------

    pub async fn cancel(&self, shift_id: &str, reason: Option<String>) -> Result<Shift, EngineError> {
        self.plain(shift_id, ShiftEvent::Cancel { reason }).await
    }

    pub async fn mark_no_show(&self, shift_id: &str) -> Result<Shift, EngineError> {
        self.plain(shift_id, ShiftEvent::MarkNoShow).await
    }

    pub async fn record_trip(&self, shift_id: &str, revenue_cents: i64) -> Result<Shift, EngineError> {
        if revenue_cents < 0 {
            return Err(EngineError::Validation(format!(
                "trip revenue must not be negative (got {revenue_cents})"
            )));
        }
        let now = self.clock.now();
        self.transition(
            shift_id,
            EventKind::RecordTrip,
            Box::new(move |shift, _driver| {
                check_transition(shift.status, EventKind::RecordTrip)?;
                if trip_totals(shift, revenue_cents).is_none() {
                    return Err(EngineError::Validation(format!(
                        "trip revenue {revenue_cents} overflows the shift total of {} ({} trips)",
                        shift.total_revenue_cents, shift.trip_count
                    )));
                }
                apply(shift, ShiftEvent::RecordTrip { revenue_cents }, now)?;
                Ok(())
            }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // reads
    // -----------------------------------------------------------------------

    pub async fn get_shift(&self, shift_id: &str) -> Result<ShiftView, EngineError> {
        let shift = self
            .io("load_shift", self.store.shift(shift_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("shift {shift_id}")))?;
        let metrics = ShiftMetrics::derive(&shift, self.clock.now());
        Ok(ShiftView { shift, metrics })
    }

    pub async fn shifts_for_driver(&self, driver_id: &str) -> Result<Vec<Shift>, EngineError> {
        if self
            .io("load_driver", self.store.driver(driver_id))
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("driver {driver_id}")));
        }
        let mut shifts = self
            .io("load_driver_shifts", self.store.shifts_for_driver(driver_id))
            .await?;
        shifts.sort_by_key(|s| s.scheduled_start);
        Ok(shifts)
    }

    /// Range read used by the roster views.
    pub async fn shifts_on(
        &self,
        date: NaiveDate,
        shift_type: Option<ShiftType>,
    ) -> Result<Vec<fw_schemas::ShiftWithDriver>, EngineError> {
        self.io("load_shifts_on", self.store.shifts_on(date, shift_type))
            .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn location(lat: f64, lng: f64) -> Result<GeoPoint, EngineError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(EngineError::Validation(format!("latitude out of range: {lat}")));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(EngineError::Validation(format!("longitude out of range: {lng}")));
    }
    Ok(GeoPoint::new(lat, lng))
}

fn ensure_inside(point: GeoPoint, fence: &Geofence, action: &str) -> Result<(), EngineError> {
    let chk = check_geofence(point, fence);
    if chk.is_inside() {
        return Ok(());
    }
    Err(EngineError::Validation(format!(
        "outside {action} geofence '{}': {:.1} m from center (radius {:.0} m)",
        fence.name, chk.distance_m, chk.radius_m
    )))
}
