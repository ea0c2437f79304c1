//! fw-integrity
//!
//! Dashcam-obstruction (sabotage) detection over a per-driver streak counter.
//!
//! - `engine`: pure decision rules (violation test, threshold, alert payload).
//! - `counter`: contracts for the TTL counter store and the incident sink.
//! - `monitor`: `IntegrityMonitor`, the async check loop body.
//!
//! Runs independently of shift state.

mod counter;
mod engine;
mod monitor;

pub use counter::{IncidentSink, StreakTick, ViolationCounter};
pub use engine::{
    build_alert, is_violating, violation_key, MonitorConfig, TelemetrySample, ALERT_SEVERITY,
    VIOLATION_KEY_PREFIX,
};
pub use monitor::{CheckOutcome, IntegrityMonitor};
