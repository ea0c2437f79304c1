//! fw-shift
//!
//! Shift lifecycle: the state machine governing a driver's timed shift, the
//! default shift windows, and the read-time metrics derived from stored
//! timestamps.
//!
//! Layering:
//! - `state_machine`, `windows`, `metrics` are pure deterministic logic. No IO,
//!   no wall-clock; callers pass `now`.
//! - `service::ShiftLifecycle` runs each transition as one atomic
//!   read-modify-write against a [`ShiftStore`], with gates evaluated inside the
//!   store's isolation boundary.

mod metrics;
mod service;
pub mod state_machine;
mod store;
mod windows;

pub use fw_schemas::{Clock, SystemClock};
pub use metrics::{lateness, Lateness, ShiftMetrics};
pub use service::{
    ClockInOutcome, ClockInRequest, ClockOutOutcome, ClockOutRequest, CreateShiftRequest,
    ShiftLifecycle, ShiftView, DEFAULT_IO_TIMEOUT,
};
pub use state_machine::{apply, check_transition, trip_totals, EventKind, ShiftEvent, TransitionError};
pub use store::{find_overlap, overlap_conflict, ShiftMutation, ShiftStore};
pub use windows::{default_window, shift_date_for, DEFAULT_TIMEZONE};

/// Arrival later than `scheduled_start + GRACE_PERIOD_MINUTES` is late.
pub const GRACE_PERIOD_MINUTES: i64 = 5;

/// Drivers are expected on site this many minutes before `scheduled_start`.
pub const EARLY_ARRIVAL_MINUTES: i64 = 20;

/// Worked time below this share of the scheduled window is underworking,
/// expressed as a ratio of tenths so the comparison stays in integers.
pub const UNDERWORK_THRESHOLD_TENTHS: i64 = 9;
