//! Shift state machine
//!
//! # Design
//!
//! Explicit state machine for a single shift. Every lifecycle event is applied
//! via [`apply`], which enforces one invariant: **legal transitions only.**
//! Illegal events return [`TransitionError`] and leave the shift untouched.
//! Terminal shifts (`COMPLETED`, `CANCELLED`, `NO_SHOW`) accept nothing.
//!
//! Gates (GPS accuracy, geofence, bond) are not evaluated here; the service
//! checks them after [`check_transition`] and before [`apply`] so that a
//! wrong-state call is always reported as a conflict first.
//!
//! # State diagram
//!
//! ```text
//!              ClockIn           BeginWork
//!  SCHEDULED ─────────► CLOCKED_IN ────────► ACTIVE ◄────────┐
//!   │   │                 │   │                │  │          │ EndBreak
//!   │   │ Cancel          │   │ StartBreak     │  │ StartBreak│
//!   │   ▼                 │   └────────────────┼──┴─► ON_BREAK
//!   │ CANCELLED (term.)   │                    │        │
//!   │                     │ ClockOut           │ClockOut│ ClockOut
//!   │ MarkNoShow          ▼                    ▼        ▼
//!   ▼                   COMPLETED (term.) ◄────┴────────┘
//! NO_SHOW (term.)
//! ```
//!
//! `RecordTrip` is accepted in `CLOCKED_IN` and `ACTIVE` and does not change
//! the state.

use chrono::{DateTime, Utc};
use fw_schemas::{BreakInterval, EngineError, GeoPoint, Shift, ShiftStatus};

// ---------------------------------------------------------------------------
// ShiftEvent
// ---------------------------------------------------------------------------

/// Events that drive state transitions of a [`Shift`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftEvent {
    /// Driver arrived and passed the presence/bond gates (→ `CLOCKED_IN`).
    ClockIn { location: GeoPoint },
    /// Driver started working (→ `ACTIVE`).
    BeginWork,
    /// Driver paused (→ `ON_BREAK`); opens a break interval.
    StartBreak { reason: Option<String> },
    /// Driver resumed (→ `ACTIVE`); closes the open break interval.
    EndBreak,
    /// Driver finished (→ `COMPLETED`); closes any open break.
    ClockOut {
        location: GeoPoint,
        odometer_reading: Option<i64>,
    },
    /// Shift withdrawn before it started (→ `CANCELLED`).
    Cancel { reason: Option<String> },
    /// Nobody arrived by the cutoff (→ `NO_SHOW`).
    MarkNoShow,
    /// A completed trip credited to this shift.
    RecordTrip { revenue_cents: i64 },
}

impl ShiftEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ShiftEvent::ClockIn { .. } => EventKind::ClockIn,
            ShiftEvent::BeginWork => EventKind::BeginWork,
            ShiftEvent::StartBreak { .. } => EventKind::StartBreak,
            ShiftEvent::EndBreak => EventKind::EndBreak,
            ShiftEvent::ClockOut { .. } => EventKind::ClockOut,
            ShiftEvent::Cancel { .. } => EventKind::Cancel,
            ShiftEvent::MarkNoShow => EventKind::MarkNoShow,
            ShiftEvent::RecordTrip { .. } => EventKind::RecordTrip,
        }
    }
}

/// Payload-free event discriminant, used for precondition checks and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ClockIn,
    BeginWork,
    StartBreak,
    EndBreak,
    ClockOut,
    Cancel,
    MarkNoShow,
    RecordTrip,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClockIn => "clock_in",
            EventKind::BeginWork => "begin_work",
            EventKind::StartBreak => "start_break",
            EventKind::EndBreak => "end_break",
            EventKind::ClockOut => "clock_out",
            EventKind::Cancel => "cancel",
            EventKind::MarkNoShow => "mark_no_show",
            EventKind::RecordTrip => "record_trip",
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when an event cannot legally be applied in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    /// The state the shift was in when the illegal event arrived.
    pub from: ShiftStatus,
    pub event: EventKind,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot {} a shift in status {}",
            self.event.as_str(),
            self.from.as_str()
        )
    }
}

impl std::error::Error for TransitionError {}

impl From<TransitionError> for EngineError {
    fn from(e: TransitionError) -> Self {
        EngineError::Conflict(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// The status an event leads to, or an error if it is illegal from `from`.
pub fn check_transition(from: ShiftStatus, event: EventKind) -> Result<ShiftStatus, TransitionError> {
    use EventKind::*;
    use ShiftStatus::*;

    let to = match (from, event) {
        (Scheduled, ClockIn) => ClockedIn,
        (ClockedIn, BeginWork) => Active,
        (ClockedIn | Active, StartBreak) => OnBreak,
        (OnBreak, EndBreak) => Active,
        (ClockedIn | Active | OnBreak, ClockOut) => Completed,
        (Scheduled, Cancel) => Cancelled,
        (Scheduled, MarkNoShow) => NoShow,
        (ClockedIn | Active, RecordTrip) => from,
        (state, ev) => return Err(TransitionError { from: state, event: ev }),
    };
    Ok(to)
}

/// Apply `event` at instant `at`.
///
/// # Errors
/// Returns [`TransitionError`] for illegal transitions; the shift is not
/// modified in that case.
pub fn apply(shift: &mut Shift, event: ShiftEvent, at: DateTime<Utc>) -> Result<(), TransitionError> {
    let to = check_transition(shift.status, event.kind())?;

    match event {
        ShiftEvent::ClockIn { location } => {
            shift.clock_in_at = Some(at);
            shift.clock_in_location = Some(location);
        }
        ShiftEvent::BeginWork | ShiftEvent::MarkNoShow => {}
        ShiftEvent::StartBreak { reason } => {
            shift.breaks.push(BreakInterval {
                started_at: at,
                ended_at: None,
                reason,
            });
        }
        ShiftEvent::EndBreak => close_open_break(shift, at),
        ShiftEvent::ClockOut {
            location,
            odometer_reading,
        } => {
            close_open_break(shift, at);
            shift.clock_out_at = Some(at);
            shift.clock_out_location = Some(location);
            if odometer_reading.is_some() {
                shift.odometer_reading = odometer_reading;
            }
            let started = shift.clock_in_at.unwrap_or(shift.scheduled_start);
            let worked = at.signed_duration_since(started).num_minutes().max(0);
            shift.online_minutes = (worked - shift.break_minutes(at)).max(0);
        }
        ShiftEvent::Cancel { reason } => shift.cancel_reason = reason,
        ShiftEvent::RecordTrip { revenue_cents } => {
            // Callers reject overflow with `trip_totals` first.
            shift.trip_count = shift.trip_count.saturating_add(1);
            shift.total_revenue_cents = shift.total_revenue_cents.saturating_add(revenue_cents);
        }
    }

    shift.status = to;
    shift.updated_at = at;
    Ok(())
}

/// Trip count and revenue after crediting one more trip, `None` on overflow.
pub fn trip_totals(shift: &Shift, revenue_cents: i64) -> Option<(i64, i64)> {
    Some((
        shift.trip_count.checked_add(1)?,
        shift.total_revenue_cents.checked_add(revenue_cents)?,
    ))
}

fn close_open_break(shift: &mut Shift, at: DateTime<Utc>) {
    if let Some(b) = shift.open_break_mut() {
        // Never end a break before it started, even under clock skew.
        b.ended_at = Some(at.max(b.started_at));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
