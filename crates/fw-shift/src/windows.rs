//! Default shift windows.
//!
//! | Type  | Local start        | Local end            |
//! |-------|--------------------|----------------------|
//! | AM    | 06:00 on the date  | 14:00 on the date    |
//! | PM    | 14:00 on the date  | 22:00 on the date    |
//! | NIGHT | 22:00 on the date  | 06:00 the next day   |
//!
//! Local times are interpreted in the fleet timezone and converted to UTC, so
//! every duration downstream is plain instant arithmetic and the NIGHT window
//! needs no midnight special-casing.

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use fw_schemas::{EngineError, ShiftType};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Manila;

fn local_instant(tz: Tz, date: NaiveDate, hour: u32) -> Result<DateTime<Utc>, EngineError> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| EngineError::Validation(format!("invalid hour {hour} on {date}")))?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // DST fold: take the first occurrence.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(EngineError::Validation(format!(
            "local time {naive} does not exist in {tz}"
        ))),
    }
}

/// Scheduled `[start, end)` for `shift_type` on the local calendar `date`.
pub fn default_window(
    shift_type: ShiftType,
    date: NaiveDate,
    tz: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let (start_hour, end_date, end_hour) = match shift_type {
        ShiftType::Am => (6, date, 14),
        ShiftType::Pm => (14, date, 22),
        ShiftType::Night => {
            let next = date
                .succ_opt()
                .ok_or_else(|| EngineError::Validation(format!("no day after {date}")))?;
            (22, next, 6)
        }
    };
    Ok((
        local_instant(tz, date, start_hour)?,
        local_instant(tz, end_date, end_hour)?,
    ))
}

/// The operational date a shift starting at `scheduled_start` belongs to.
///
/// A NIGHT shift that starts after local midnight still belongs to the
/// previous evening's date.
pub fn shift_date_for(shift_type: ShiftType, scheduled_start: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let local = scheduled_start.with_timezone(&tz);
    let date = local.date_naive();
    if shift_type == ShiftType::Night && local.hour() < 12 {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}
