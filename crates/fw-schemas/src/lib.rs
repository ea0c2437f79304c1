//! fw-schemas
//!
//! Shared records for the shift lifecycle and integrity monitoring core.
//! No behaviour beyond small accessors lives here; the state machine, gates and
//! views live in their own crates and consume these types.

mod clock;
mod error;

pub use clock::{Clock, SystemClock};
pub use error::EngineError;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shift type / status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftType {
    Am,
    Pm,
    Night,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Am => "AM",
            ShiftType::Pm => "PM",
            ShiftType::Night => "NIGHT",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(ShiftType::Am),
            "PM" => Ok(ShiftType::Pm),
            "NIGHT" => Ok(ShiftType::Night),
            other => Err(EngineError::Validation(format!(
                "unknown shift type: {other:?} (expected AM, PM or NIGHT)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Scheduled,
    ClockedIn,
    Active,
    OnBreak,
    /// Terminal.
    Completed,
    /// Terminal.
    Cancelled,
    /// Terminal.
    NoShow,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Scheduled => "SCHEDULED",
            ShiftStatus::ClockedIn => "CLOCKED_IN",
            ShiftStatus::Active => "ACTIVE",
            ShiftStatus::OnBreak => "ON_BREAK",
            ShiftStatus::Completed => "COMPLETED",
            ShiftStatus::Cancelled => "CANCELLED",
            ShiftStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s {
            "SCHEDULED" => Ok(ShiftStatus::Scheduled),
            "CLOCKED_IN" => Ok(ShiftStatus::ClockedIn),
            "ACTIVE" => Ok(ShiftStatus::Active),
            "ON_BREAK" => Ok(ShiftStatus::OnBreak),
            "COMPLETED" => Ok(ShiftStatus::Completed),
            "CANCELLED" => Ok(ShiftStatus::Cancelled),
            "NO_SHOW" => Ok(ShiftStatus::NoShow),
            other => Err(EngineError::Infrastructure(format!(
                "invalid shift status in store: {other}"
            ))),
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShiftStatus::Completed | ShiftStatus::Cancelled | ShiftStatus::NoShow
        )
    }
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Circular zone used to require physical presence for a shift action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub geofence_id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
}

// ---------------------------------------------------------------------------
// Driver (bond-relevant projection)
// ---------------------------------------------------------------------------

/// Read-only projection of the external driver registry.
///
/// Bond figures are integer minor units (centavos).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub driver_id: String,
    pub name: String,
    pub bond_balance_cents: i64,
    pub bond_required_cents: i64,
}

// ---------------------------------------------------------------------------
// Shift
// ---------------------------------------------------------------------------

/// One break taken during a shift. `ended_at == None` means the break is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl BreakInterval {
    /// Whole minutes of this break, measured up to `until` while still open.
    pub fn minutes(&self, until: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(until);
        end.signed_duration_since(self.started_at).num_minutes().max(0)
    }
}

/// One scheduled work period for one driver on one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub shift_id: String,
    pub driver_id: String,
    pub vehicle_id: String,
    pub shift_type: ShiftType,
    pub shift_date: NaiveDate,

    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,

    pub status: ShiftStatus,

    pub clock_in_at: Option<DateTime<Utc>>,
    pub clock_in_location: Option<GeoPoint>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_out_location: Option<GeoPoint>,
    pub odometer_reading: Option<i64>,

    pub online_minutes: i64,
    pub trip_count: i64,
    pub total_revenue_cents: i64,
    pub breaks: Vec<BreakInterval>,

    pub clock_in_geofence: Option<Geofence>,
    pub clock_out_geofence: Option<Geofence>,

    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    pub fn break_count(&self) -> usize {
        self.breaks.len()
    }

    /// Total break minutes; an open break counts up to `until`.
    pub fn break_minutes(&self, until: DateTime<Utc>) -> i64 {
        self.breaks.iter().map(|b| b.minutes(until)).sum()
    }

    pub fn open_break_mut(&mut self) -> Option<&mut BreakInterval> {
        self.breaks.iter_mut().rev().find(|b| b.ended_at.is_none())
    }

    /// Half-open window overlap: `[start, end)` intersects this shift's window.
    pub fn window_overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.scheduled_start < end && start < self.scheduled_end
    }
}

/// A shift joined with its driver's live profile (read-side views).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftWithDriver {
    pub shift: Shift,
    pub driver: DriverProfile,
}

// ---------------------------------------------------------------------------
// Integrity alert
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    DashcamObstruction,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::DashcamObstruction => "DASHCAM_OBSTRUCTION",
        }
    }
}

/// Emitted once per sustained-violation threshold crossing; handed to the
/// incident-management collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityAlert {
    pub driver_id: String,
    pub alert_type: AlertType,
    pub description: String,
    pub severity: u8,
    pub location: GeoPoint,
    pub speed_kph: f64,
    pub shift_id: Option<String>,
    pub trip_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
