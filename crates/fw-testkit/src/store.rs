use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use fw_schemas::{DriverProfile, EngineError, Geofence, Shift, ShiftType, ShiftWithDriver};
use fw_shift::{find_overlap, overlap_conflict, ShiftMutation, ShiftStore};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Records {
    drivers: BTreeMap<String, DriverProfile>,
    geofences: BTreeMap<String, Geofence>,
    shifts: BTreeMap<String, Shift>,
}

#[derive(Debug, Default)]
pub struct InMemoryShiftStore {
    records: Mutex<Records>,
    failing: AtomicBool,
    stall_ms: AtomicU64,
}

impl InMemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_driver(&self, driver: DriverProfile) {
        self.records
            .lock()
            .await
            .drivers
            .insert(driver.driver_id.clone(), driver);
    }

    pub async fn add_geofence(&self, fence: Geofence) {
        self.records
            .lock()
            .await
            .geofences
            .insert(fence.geofence_id.clone(), fence);
    }

    /// Raw insert, bypassing the overlap rule. Fixture use only.
    pub async fn put_shift(&self, shift: Shift) {
        self.records
            .lock()
            .await
            .shifts
            .insert(shift.shift_id.clone(), shift);
    }

    pub async fn shift_count(&self) -> usize {
        self.records.lock().await.shifts.len()
    }

    /// Every call fails with `Infrastructure` while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call sleeps this long first (0 disables).
    pub fn set_stall(&self, stall: Duration) {
        self.stall_ms.store(stall.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<(), EngineError> {
        let stall = self.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Infrastructure("shift store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ShiftStore for InMemoryShiftStore {
    async fn driver(&self, driver_id: &str) -> Result<Option<DriverProfile>, EngineError> {
        self.enter().await?;
        Ok(self.records.lock().await.drivers.get(driver_id).cloned())
    }

    async fn geofence(&self, geofence_id: &str) -> Result<Option<Geofence>, EngineError> {
        self.enter().await?;
        Ok(self.records.lock().await.geofences.get(geofence_id).cloned())
    }

    async fn shift(&self, shift_id: &str) -> Result<Option<Shift>, EngineError> {
        self.enter().await?;
        Ok(self.records.lock().await.shifts.get(shift_id).cloned())
    }

    async fn insert_shift(&self, shift: Shift) -> Result<Shift, EngineError> {
        self.enter().await?;
        let mut records = self.records.lock().await;
        if !records.drivers.contains_key(&shift.driver_id) {
            return Err(EngineError::NotFound(format!("driver {}", shift.driver_id)));
        }
        let existing: Vec<Shift> = records
            .shifts
            .values()
            .filter(|s| s.driver_id == shift.driver_id)
            .cloned()
            .collect();
        if let Some(clash) = find_overlap(&existing, &shift) {
            return Err(overlap_conflict(&shift.driver_id, &clash.shift_id, clash.status));
        }
        records.shifts.insert(shift.shift_id.clone(), shift.clone());
        Ok(shift)
    }

    async fn update_shift(
        &self,
        shift_id: &str,
        mutate: ShiftMutation,
    ) -> Result<Shift, EngineError> {
        self.enter().await?;
        let mut records = self.records.lock().await;
        let mut shift = records
            .shifts
            .get(shift_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("shift {shift_id}")))?;
        let driver = records
            .drivers
            .get(&shift.driver_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("driver {}", shift.driver_id)))?;

        // Work on a copy; the stored record only changes on success.
        mutate(&mut shift, &driver)?;
        records.shifts.insert(shift.shift_id.clone(), shift.clone());
        Ok(shift)
    }

    async fn shifts_on(
        &self,
        date: NaiveDate,
        shift_type: Option<ShiftType>,
    ) -> Result<Vec<ShiftWithDriver>, EngineError> {
        self.enter().await?;
        let records = self.records.lock().await;
        Ok(records
            .shifts
            .values()
            .filter(|s| s.shift_date == date && shift_type.map_or(true, |t| s.shift_type == t))
            .filter_map(|s| {
                records.drivers.get(&s.driver_id).map(|d| ShiftWithDriver {
                    shift: s.clone(),
                    driver: d.clone(),
                })
            })
            .collect())
    }

    async fn shifts_for_driver(&self, driver_id: &str) -> Result<Vec<Shift>, EngineError> {
        self.enter().await?;
        Ok(self
            .records
            .lock()
            .await
            .shifts
            .values()
            .filter(|s| s.driver_id == driver_id)
            .cloned()
            .collect())
    }
}
