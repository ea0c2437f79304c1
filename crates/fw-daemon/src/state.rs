//! Shared runtime state for fw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine services are
//! cheap `Clone` handles over `Arc`ed collaborators; this module owns nothing
//! async itself apart from the heartbeat task.

use std::time::Duration;

use fw_integrity::IntegrityMonitor;
use fw_roster::RosterViews;
use fw_schemas::IntegrityAlert;
use fw_shift::ShiftLifecycle;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    IntegrityAlert {
        incident_id: Option<String>,
        alert: IntegrityAlert,
    },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub lifecycle: ShiftLifecycle,
    pub roster: RosterViews,
    pub integrity: IntegrityMonitor,
}

impl AppState {
    pub fn new(lifecycle: ShiftLifecycle, integrity: IntegrityMonitor) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "fw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            roster: RosterViews::new(lifecycle.clone()),
            lifecycle,
            integrity,
        }
    }

    /// Fan an emitted alert out to SSE subscribers. No subscribers is fine.
    pub fn publish_alert(&self, incident_id: Option<String>, alert: IntegrityAlert) {
        let _ = self.bus.send(BusMsg::IntegrityAlert { incident_id, alert });
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
