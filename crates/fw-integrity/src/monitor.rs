use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fw_schemas::{Clock, EngineError, IntegrityAlert};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::counter::{IncidentSink, ViolationCounter};
use crate::engine::{build_alert, is_violating, violation_key, MonitorConfig, TelemetrySample};

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    /// The emitted alert, for in-process fan-out.
    #[serde(skip)]
    pub alert: Option<IntegrityAlert>,
}

impl CheckOutcome {
    fn quiet() -> Self {
        Self {
            triggered: false,
            incident_id: None,
            alert: None,
        }
    }
}

#[derive(Clone)]
pub struct IntegrityMonitor {
    counter: Arc<dyn ViolationCounter>,
    sink: Arc<dyn IncidentSink>,
    clock: Arc<dyn Clock>,
    cfg: MonitorConfig,
    io_timeout: Duration,
}

impl IntegrityMonitor {
    pub fn new(
        counter: Arc<dyn ViolationCounter>,
        sink: Arc<dyn IncidentSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            counter,
            sink,
            clock,
            cfg: MonitorConfig::standard(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_config(mut self, cfg: MonitorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    async fn io<T, F>(&self, op: &'static str, driver_id: &str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        let res = match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(EngineError::Infrastructure(format!(
                "{op} timed out after {} ms",
                self.io_timeout.as_millis()
            ))),
        };
        if let Err(e) = &res {
            // The detector is blind for this driver until the store recovers.
            error!(op, driver_id, error = %e, "integrity counter store failure");
        }
        res
    }

    /// Evaluate one telemetry sample.
    ///
    /// A clean sample clears the streak. A violating sample extends it; the
    /// sample that reaches the threshold emits exactly one alert and the
    /// streak starts over. Store failures are `Infrastructure`, never a
    /// verdict either way.
    pub async fn check(&self, sample: TelemetrySample) -> Result<CheckOutcome, EngineError> {
        sample.validate()?;
        let key = violation_key(&sample.driver_id);
        let driver_id = sample.driver_id.as_str();

        if !is_violating(&self.cfg, sample.speed_kph, sample.dashcam_obstructed) {
            self.io("clear", driver_id, self.counter.clear(&key)).await?;
            return Ok(CheckOutcome::quiet());
        }

        let threshold = self.cfg.threshold_checks();
        let tick = match self
            .io(
                "record_violation",
                driver_id,
                self.counter
                    .record_violation(&key, self.cfg.counter_ttl, threshold),
            )
            .await
        {
            Ok(tick) => tick,
            Err(e) => return Err(self.crossing_unknown(&sample, e)),
        };

        if !tick.crossed {
            info!(
                driver_id,
                count = tick.count,
                threshold,
                speed_kph = sample.speed_kph,
                "integrity violation"
            );
            return Ok(CheckOutcome::quiet());
        }

        let alert = build_alert(&self.cfg, &sample, tick.count, self.clock.now());
        let incident_id = match tokio::time::timeout(self.io_timeout, self.sink.create_incident(&alert)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return Err(self.alert_lost(&alert, e)),
            Err(_) => {
                let e = EngineError::Infrastructure(format!(
                    "create_incident timed out after {} ms",
                    self.io_timeout.as_millis()
                ));
                return Err(self.alert_lost(&alert, e));
            }
        };

        warn!(
            driver_id,
            incident_id = %incident_id,
            count = tick.count,
            speed_kph = sample.speed_kph,
            shift_id = ?sample.shift_id,
            trip_id = ?sample.trip_id,
            "dashcam obstruction alert"
        );
        Ok(CheckOutcome {
            triggered: true,
            incident_id: Some(incident_id),
            alert: Some(alert),
        })
    }

    /// The streak was already reset; the payload is logged so it can be replayed.
    fn alert_lost(&self, alert: &IntegrityAlert, e: EngineError) -> EngineError {
        let payload = serde_json::to_string(alert).unwrap_or_else(|_| format!("{alert:?}"));
        error!(
            driver_id = %alert.driver_id,
            error = %e,
            alert = %payload,
            "incident creation failed after threshold crossing"
        );
        e
    }

    /// The store may have applied the increment, and even crossed and reset
    /// the streak, before the reply was lost. Log the alert this sample would
    /// raise at the threshold so a crossing can be reconstructed.
    fn crossing_unknown(&self, sample: &TelemetrySample, e: EngineError) -> EngineError {
        let threshold = self.cfg.threshold_checks();
        let candidate = build_alert(&self.cfg, sample, threshold, self.clock.now());
        let payload = serde_json::to_string(&candidate).unwrap_or_else(|_| format!("{candidate:?}"));
        error!(
            driver_id = %sample.driver_id,
            error = %e,
            alert = %payload,
            "violation outcome unknown; a threshold crossing may have been lost"
        );
        e
    }

    pub async fn violation_count(&self, driver_id: &str) -> Result<u64, EngineError> {
        let key = violation_key(driver_id);
        self.io("count", driver_id, self.counter.count(&key)).await
    }

    pub async fn reset_violation_counter(&self, driver_id: &str) -> Result<(), EngineError> {
        let key = violation_key(driver_id);
        self.io("clear", driver_id, self.counter.clear(&key)).await?;
        info!(driver_id, "violation counter reset by operator");
        Ok(())
    }
}
