//! Decision rules. No IO, no clock; `now` is passed in.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fw_schemas::{AlertType, EngineError, GeoPoint, IntegrityAlert};
use serde::{Deserialize, Serialize};

pub const VIOLATION_KEY_PREFIX: &str = "fw:integrity:violations:";

pub const ALERT_SEVERITY: u8 = 2;

/// Detection constants. Fixed for the fleet; `standard()` is the only
/// production constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Strictly above this speed counts as moving.
    pub speed_threshold_kph: f64,
    pub obstruction_secs: u64,
    pub check_interval_secs: u64,
    /// A gap this long without a violating check ends the streak.
    pub counter_ttl: Duration,
}

impl MonitorConfig {
    pub fn standard() -> Self {
        Self {
            speed_threshold_kph: 10.0,
            obstruction_secs: 30,
            check_interval_secs: 5,
            counter_ttl: Duration::from_secs(60),
        }
    }

    /// `ceil(obstruction / interval)`, at least 1.
    pub fn threshold_checks(&self) -> u64 {
        let interval = self.check_interval_secs.max(1);
        self.obstruction_secs.div_ceil(interval).max(1)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// One telemetry sample for one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub driver_id: String,
    pub speed_kph: f64,
    pub lat: f64,
    pub lng: f64,
    pub dashcam_obstructed: bool,
    #[serde(default)]
    pub shift_id: Option<String>,
    #[serde(default)]
    pub trip_id: Option<String>,
}

impl TelemetrySample {
    pub fn validate(&self) -> Result<GeoPoint, EngineError> {
        if self.driver_id.trim().is_empty() {
            return Err(EngineError::Validation("driver id is required".to_string()));
        }
        if !self.speed_kph.is_finite() || self.speed_kph < 0.0 {
            return Err(EngineError::Validation(format!(
                "speed must be a non-negative number (got {})",
                self.speed_kph
            )));
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(EngineError::Validation(format!("latitude out of range: {}", self.lat)));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(EngineError::Validation(format!("longitude out of range: {}", self.lng)));
        }
        Ok(GeoPoint::new(self.lat, self.lng))
    }
}

pub fn is_violating(cfg: &MonitorConfig, speed_kph: f64, dashcam_obstructed: bool) -> bool {
    dashcam_obstructed && speed_kph > cfg.speed_threshold_kph
}

pub fn violation_key(driver_id: &str) -> String {
    format!("{VIOLATION_KEY_PREFIX}{driver_id}")
}

pub fn build_alert(
    cfg: &MonitorConfig,
    sample: &TelemetrySample,
    streak: u64,
    now: DateTime<Utc>,
) -> IntegrityAlert {
    IntegrityAlert {
        driver_id: sample.driver_id.clone(),
        alert_type: AlertType::DashcamObstruction,
        description: format!(
            "Dashcam obstructed while moving for {streak} consecutive checks (~{}s) at {:.1} kph",
            streak * cfg.check_interval_secs,
            sample.speed_kph
        ),
        severity: ALERT_SEVERITY,
        location: GeoPoint::new(sample.lat, sample.lng),
        speed_kph: sample.speed_kph,
        shift_id: sample.shift_id.clone(),
        trip_id: sample.trip_id.clone(),
        created_at: now,
    }
}
