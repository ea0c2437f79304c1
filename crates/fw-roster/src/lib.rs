//! fw-roster
//!
//! Read-side operational views computed on demand from the same shift records
//! the lifecycle service mutates:
//! - roll call: who is scheduled for a shift, who has arrived, who may start
//! - leaderboard: completed shifts ranked by revenue per online hour
//!
//! `roll_call` and `leaderboard` are pure over already-loaded rows;
//! [`RosterViews`] only adds the (timeout-bounded) load.

mod leaderboard;
mod roll_call;

pub use leaderboard::{rank_completed, LeaderboardEntry, DEFAULT_LEADERBOARD_LIMIT};
pub use roll_call::{build_roll_call, RollCallEntry, RollCallStats, RollCallView};

use chrono::NaiveDate;
use fw_schemas::{EngineError, ShiftType};
use fw_shift::ShiftLifecycle;
use tracing::debug;

#[derive(Clone)]
pub struct RosterViews {
    lifecycle: ShiftLifecycle,
}

impl RosterViews {
    pub fn new(lifecycle: ShiftLifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn get_roll_call(
        &self,
        shift_type: ShiftType,
        date: NaiveDate,
    ) -> Result<RollCallView, EngineError> {
        let rows = self.lifecycle.shifts_on(date, Some(shift_type)).await?;
        let view = build_roll_call(shift_type, date, rows);
        debug!(
            shift_type = shift_type.as_str(),
            %date,
            total = view.stats.total,
            arrived = view.stats.arrived,
            blocked = view.stats.blocked,
            "roll call"
        );
        Ok(view)
    }

    pub async fn get_leaderboard(
        &self,
        date: NaiveDate,
        shift_type: Option<ShiftType>,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let rows = self.lifecycle.shifts_on(date, shift_type).await?;
        Ok(rank_completed(date, shift_type, rows, limit))
    }
}
