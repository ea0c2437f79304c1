use std::cmp::Ordering;

use chrono::NaiveDate;
use fw_schemas::{ShiftStatus, ShiftType, ShiftWithDriver};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub driver_id: String,
    pub driver_name: String,
    pub shift_id: String,
    pub revenue_per_hour_cents: f64,
    pub total_revenue_cents: i64,
    pub trip_count: i64,
    pub online_minutes: i64,
    pub utilization_percent: f64,
}

/// Revenue per online hour as an exact fraction `(revenue * 60) / minutes`.
/// Zero online minutes is rate 0.
#[derive(Clone, Copy, Debug)]
struct Rate {
    num: i128,
    den: i128,
}

impl Rate {
    fn of(revenue_cents: i64, online_minutes: i64) -> Self {
        if online_minutes <= 0 {
            return Rate { num: 0, den: 1 };
        }
        Rate {
            num: revenue_cents as i128 * 60,
            den: online_minutes as i128,
        }
    }

    fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rate {}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive.
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

fn utilization_percent(online_minutes: i64, scheduled_minutes: i64) -> f64 {
    if scheduled_minutes <= 0 {
        return 0.0;
    }
    let pct = online_minutes.max(0) as f64 * 100.0 / scheduled_minutes as f64;
    (pct * 10.0).round() / 10.0
}

/// Rank `COMPLETED` shifts on `date` (and of `shift_type`, when given) by
/// revenue per online hour, descending.
///
/// Rows are first ordered by total revenue descending; the rate sort is
/// stable, so equal rates keep that order.
pub fn rank_completed(
    date: NaiveDate,
    shift_type: Option<ShiftType>,
    rows: Vec<ShiftWithDriver>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut completed: Vec<ShiftWithDriver> = rows
        .into_iter()
        .filter(|r| {
            r.shift.status == ShiftStatus::Completed
                && r.shift.shift_date == date
                && shift_type.map_or(true, |t| r.shift.shift_type == t)
        })
        .collect();

    completed.sort_by(|a, b| b.shift.total_revenue_cents.cmp(&a.shift.total_revenue_cents));
    completed.sort_by(|a, b| {
        let ra = Rate::of(a.shift.total_revenue_cents, a.shift.online_minutes);
        let rb = Rate::of(b.shift.total_revenue_cents, b.shift.online_minutes);
        rb.cmp(&ra)
    });

    completed
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| {
            let scheduled_minutes = r
                .shift
                .scheduled_end
                .signed_duration_since(r.shift.scheduled_start)
                .num_minutes();
            LeaderboardEntry {
                rank: i + 1,
                revenue_per_hour_cents: Rate::of(r.shift.total_revenue_cents, r.shift.online_minutes)
                    .as_f64(),
                utilization_percent: utilization_percent(r.shift.online_minutes, scheduled_minutes),
                total_revenue_cents: r.shift.total_revenue_cents,
                trip_count: r.shift.trip_count,
                online_minutes: r.shift.online_minutes,
                driver_id: r.driver.driver_id,
                driver_name: r.driver.name,
                shift_id: r.shift.shift_id,
            }
        })
        .collect()
}
