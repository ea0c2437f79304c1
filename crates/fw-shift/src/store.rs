//! Record-store contract required by the lifecycle service and the roster
//! views. Implementations: `fw-db` (Postgres) and `fw-testkit` (in-memory).

use chrono::NaiveDate;
use fw_schemas::{
    DriverProfile, EngineError, Geofence, Shift, ShiftStatus, ShiftType, ShiftWithDriver,
};

/// A read-modify-write step executed inside the store's isolation boundary.
///
/// Receives the locked shift and its driver's live bond projection. Returning
/// `Err` aborts the unit: nothing is persisted.
pub type ShiftMutation =
    Box<dyn FnOnce(&mut Shift, &DriverProfile) -> Result<(), EngineError> + Send>;

#[async_trait::async_trait]
pub trait ShiftStore: Send + Sync {
    async fn driver(&self, driver_id: &str) -> Result<Option<DriverProfile>, EngineError>;

    async fn geofence(&self, geofence_id: &str) -> Result<Option<Geofence>, EngineError>;

    async fn shift(&self, shift_id: &str) -> Result<Option<Shift>, EngineError>;

    /// Insert a new `SCHEDULED` shift.
    ///
    /// Must atomically refuse with `Conflict` when the driver already holds a
    /// non-terminal shift whose window overlaps (see [`find_overlap`]), so two
    /// concurrent creates for one driver cannot both succeed.
    async fn insert_shift(&self, shift: Shift) -> Result<Shift, EngineError>;

    /// Atomically load the shift (and its driver), run `mutate`, and persist
    /// the result. `NotFound` when the shift or its driver is missing.
    ///
    /// Two concurrent calls on the same shift must serialise: the second
    /// observes the first's committed state.
    async fn update_shift(&self, shift_id: &str, mutate: ShiftMutation)
        -> Result<Shift, EngineError>;

    /// Shifts on `date` (optionally of one type) joined with their drivers.
    async fn shifts_on(
        &self,
        date: NaiveDate,
        shift_type: Option<ShiftType>,
    ) -> Result<Vec<ShiftWithDriver>, EngineError>;

    async fn shifts_for_driver(&self, driver_id: &str) -> Result<Vec<Shift>, EngineError>;
}

/// First non-terminal shift in `existing` that overlaps `candidate`'s window.
pub fn find_overlap<'a>(existing: &'a [Shift], candidate: &Shift) -> Option<&'a Shift> {
    existing.iter().find(|s| {
        s.shift_id != candidate.shift_id
            && s.driver_id == candidate.driver_id
            && !s.status.is_terminal()
            && s.window_overlaps(candidate.scheduled_start, candidate.scheduled_end)
    })
}

/// The `Conflict` every store returns for an overlapping create.
pub fn overlap_conflict(driver_id: &str, existing_shift_id: &str, status: ShiftStatus) -> EngineError {
    EngineError::Conflict(format!(
        "driver {driver_id} already has overlapping shift {existing_shift_id} in status {}",
        status.as_str()
    ))
}
