//! Read-time projections over stored shift timestamps.
//!
//! Lateness and underworking are never persisted; they are recomputed from
//! `scheduled_*`, `clock_in_at`, `clock_out_at` and the break list whenever a
//! shift is read. All math is in whole minutes.

use chrono::{DateTime, Duration, Utc};
use fw_schemas::{Shift, ShiftStatus};
use serde::{Deserialize, Serialize};

use crate::{GRACE_PERIOD_MINUTES, UNDERWORK_THRESHOLD_TENTHS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lateness {
    pub is_late: bool,
    pub minutes_late: i64,
}

/// Lateness of an arrival against the scheduled start plus grace period.
pub fn lateness(scheduled_start: DateTime<Utc>, arrived_at: DateTime<Utc>) -> Lateness {
    let cutoff = scheduled_start + Duration::minutes(GRACE_PERIOD_MINUTES);
    if arrived_at > cutoff {
        Lateness {
            is_late: true,
            minutes_late: arrived_at.signed_duration_since(scheduled_start).num_minutes(),
        }
    } else {
        Lateness::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftMetrics {
    pub scheduled_minutes: i64,
    /// Clock-in (or scheduled start) to clock-out, or to `now` while live.
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub break_count: usize,
    pub lateness: Lateness,
    /// Only meaningful once the shift is `COMPLETED`.
    pub is_underworking: bool,
    /// A negative scheduled or worked duration was observed and clamped.
    pub clock_anomaly: bool,
}

impl ShiftMetrics {
    pub fn derive(shift: &Shift, now: DateTime<Utc>) -> Self {
        let raw_scheduled = shift
            .scheduled_end
            .signed_duration_since(shift.scheduled_start)
            .num_minutes();

        let started = shift.clock_in_at.unwrap_or(shift.scheduled_start);
        let raw_worked = match (shift.status, shift.clock_out_at) {
            (_, Some(out)) => out.signed_duration_since(started).num_minutes(),
            (ShiftStatus::ClockedIn | ShiftStatus::Active | ShiftStatus::OnBreak, None) => {
                now.signed_duration_since(started).num_minutes()
            }
            _ => 0,
        };

        let scheduled_minutes = raw_scheduled.max(0);
        let worked_minutes = raw_worked.max(0);
        let break_until = shift.clock_out_at.unwrap_or(now);

        Self {
            scheduled_minutes,
            worked_minutes,
            break_minutes: shift.break_minutes(break_until),
            break_count: shift.break_count(),
            lateness: shift
                .clock_in_at
                .map(|at| lateness(shift.scheduled_start, at))
                .unwrap_or_default(),
            is_underworking: shift.status == ShiftStatus::Completed
                && is_underworking(worked_minutes, scheduled_minutes),
            clock_anomaly: raw_scheduled < 0 || raw_worked < 0,
        }
    }
}

/// `worked < 0.9 * scheduled`, evaluated on integers.
fn is_underworking(worked_minutes: i64, scheduled_minutes: i64) -> bool {
    worked_minutes * 10 < scheduled_minutes * UNDERWORK_THRESHOLD_TENTHS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn within_grace_is_not_late() {
        assert_eq!(lateness(t(6, 0), t(6, 5)), Lateness::default());
        assert_eq!(lateness(t(6, 0), t(5, 30)), Lateness::default());
    }

    #[test]
    fn late_minutes_count_from_scheduled_start() {
        let l = lateness(t(6, 0), t(6, 12));
        assert!(l.is_late);
        assert_eq!(l.minutes_late, 12);
    }

    #[test]
    fn underworking_boundary() {
        // 480 scheduled → 432 is exactly 90%.
        assert!(!is_underworking(432, 480));
        assert!(is_underworking(431, 480));
        assert!(!is_underworking(0, 0));
    }
}
