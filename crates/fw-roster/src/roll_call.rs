use chrono::{DateTime, Duration, NaiveDate, Utc};
use fw_gates::check_bond;
use fw_schemas::{ShiftStatus, ShiftType, ShiftWithDriver};
use fw_shift::{EARLY_ARRIVAL_MINUTES, GRACE_PERIOD_MINUTES};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollCallEntry {
    pub driver_id: String,
    pub driver_name: String,
    pub shift_id: String,
    pub status: ShiftStatus,
    pub arrived_at: Option<DateTime<Utc>>,
    pub is_late: bool,
    /// Bond preview from the driver's live figures, whether or not they have
    /// already clocked in.
    pub can_start: bool,
    pub bond_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCallStats {
    pub total: usize,
    pub arrived: usize,
    pub not_arrived: usize,
    pub eligible: usize,
    pub blocked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollCallView {
    pub shift_type: ShiftType,
    pub date: NaiveDate,
    pub entries: Vec<RollCallEntry>,
    pub stats: RollCallStats,
}

/// Latest on-time arrival for roll call: drivers report
/// `EARLY_ARRIVAL_MINUTES` before the start, with the usual grace on top.
fn report_cutoff(scheduled_start: DateTime<Utc>) -> DateTime<Utc> {
    scheduled_start - Duration::minutes(EARLY_ARRIVAL_MINUTES)
        + Duration::minutes(GRACE_PERIOD_MINUTES)
}

/// Roster for one shift type on one date. Cancelled shifts are left out;
/// rows for other types or dates are ignored.
pub fn build_roll_call(
    shift_type: ShiftType,
    date: NaiveDate,
    rows: Vec<ShiftWithDriver>,
) -> RollCallView {
    let mut entries: Vec<RollCallEntry> = rows
        .into_iter()
        .filter(|r| {
            r.shift.shift_type == shift_type
                && r.shift.shift_date == date
                && r.shift.status != ShiftStatus::Cancelled
        })
        .map(|r| {
            let gate = check_bond(r.driver.bond_balance_cents, r.driver.bond_required_cents);
            let arrived_at = r.shift.clock_in_at;
            RollCallEntry {
                is_late: arrived_at.is_some_and(|at| at > report_cutoff(r.shift.scheduled_start)),
                can_start: gate.is_permitted(),
                bond_percent: gate.percent(),
                driver_id: r.driver.driver_id,
                driver_name: r.driver.name,
                shift_id: r.shift.shift_id,
                status: r.shift.status,
                arrived_at,
            }
        })
        .collect();

    // Stable: equal driver ids keep load order.
    entries.sort_by(|a, b| a.driver_id.cmp(&b.driver_id));

    let mut stats = RollCallStats {
        total: entries.len(),
        ..RollCallStats::default()
    };
    for e in &entries {
        if e.arrived_at.is_some() {
            stats.arrived += 1;
        } else {
            stats.not_arrived += 1;
        }
        if e.can_start {
            stats.eligible += 1;
        } else {
            stats.blocked += 1;
        }
    }

    RollCallView {
        shift_type,
        date,
        entries,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fw_schemas::{DriverProfile, Shift};

    fn row(driver: &str, status: ShiftStatus, arrived: Option<DateTime<Utc>>, bond: i64) -> ShiftWithDriver {
        let start = Utc.with_ymd_and_hms(2025, 2, 28, 22, 0, 0).unwrap();
        ShiftWithDriver {
            shift: Shift {
                shift_id: format!("S-{driver}"),
                driver_id: driver.to_string(),
                vehicle_id: "V1".to_string(),
                shift_type: ShiftType::Am,
                shift_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                scheduled_start: start,
                scheduled_end: start + Duration::hours(8),
                status,
                clock_in_at: arrived,
                clock_in_location: None,
                clock_out_at: None,
                clock_out_location: None,
                odometer_reading: None,
                online_minutes: 0,
                trip_count: 0,
                total_revenue_cents: 0,
                breaks: vec![],
                clock_in_geofence: None,
                clock_out_geofence: None,
                cancel_reason: None,
                created_at: start,
                updated_at: start,
            },
            driver: DriverProfile {
                driver_id: driver.to_string(),
                name: format!("Driver {driver}"),
                bond_balance_cents: bond,
                bond_required_cents: 500_000,
            },
        }
    }

    #[test]
    fn late_means_after_start_minus_fifteen() {
        let start = Utc.with_ymd_and_hms(2025, 2, 28, 22, 0, 0).unwrap();
        assert_eq!(report_cutoff(start), start - Duration::minutes(15));
    }

    #[test]
    fn cancelled_excluded_and_sorted_by_driver() {
        let start = Utc.with_ymd_and_hms(2025, 2, 28, 22, 0, 0).unwrap();
        let view = build_roll_call(
            ShiftType::Am,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            vec![
                row("D003", ShiftStatus::Scheduled, None, 200_000),
                row("D001", ShiftStatus::ClockedIn, Some(start - Duration::minutes(30)), 500_000),
                row("D002", ShiftStatus::Cancelled, None, 500_000),
                row("D004", ShiftStatus::Active, Some(start - Duration::minutes(10)), 500_000),
            ],
        );

        let ids: Vec<_> = view.entries.iter().map(|e| e.driver_id.as_str()).collect();
        assert_eq!(ids, ["D001", "D003", "D004"]);
        assert!(!view.entries[0].is_late);
        assert!(view.entries[2].is_late);
        assert!(!view.entries[1].can_start);

        assert_eq!(
            view.stats,
            RollCallStats {
                total: 3,
                arrived: 2,
                not_arrived: 1,
                eligible: 2,
                blocked: 1,
            }
        );
    }
}
