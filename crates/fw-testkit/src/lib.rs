//! fw-testkit
//!
//! In-process doubles for every collaborator contract, plus fixtures, so the
//! scenario suites run without Postgres or Redis:
//! - [`InMemoryShiftStore`]: one mutex around the whole record set, so every
//!   read-modify-write is trivially atomic.
//! - [`InMemoryViolationCounter`]: TTL measured on `tokio::time::Instant`, so
//!   paused-time tests can expire streaks deterministically.
//! - [`RecordingIncidentSink`], [`ManualClock`].
//!
//! Every double can be switched into a failing or stalling mode to exercise
//! the infrastructure paths.

mod clock;
mod counter;
pub mod fixtures;
mod sink;
mod store;

pub use clock::ManualClock;
pub use counter::InMemoryViolationCounter;
pub use sink::RecordingIncidentSink;
pub use store::InMemoryShiftStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fw_integrity::IntegrityMonitor;
use fw_shift::ShiftLifecycle;

/// Lifecycle service wired to in-memory doubles.
pub struct Harness {
    pub store: Arc<InMemoryShiftStore>,
    pub clock: Arc<ManualClock>,
    pub lifecycle: ShiftLifecycle,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryShiftStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let lifecycle = ShiftLifecycle::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            lifecycle,
        }
    }

    /// Drivers D001 (full bond), D002 (40% bond) and the Manila depot fence.
    pub async fn seeded(now: DateTime<Utc>) -> Self {
        let h = Self::new(now);
        h.store.add_driver(fixtures::driver_full_bond()).await;
        h.store.add_driver(fixtures::driver_short_bond()).await;
        h.store.add_geofence(fixtures::manila_depot()).await;
        h
    }
}

/// Integrity monitor wired to in-memory doubles.
pub struct IntegrityHarness {
    pub counter: Arc<InMemoryViolationCounter>,
    pub sink: Arc<RecordingIncidentSink>,
    pub clock: Arc<ManualClock>,
    pub monitor: IntegrityMonitor,
}

impl IntegrityHarness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let counter = Arc::new(InMemoryViolationCounter::new());
        let sink = Arc::new(RecordingIncidentSink::new());
        let clock = Arc::new(ManualClock::new(now));
        let monitor = IntegrityMonitor::new(counter.clone(), sink.clone(), clock.clone());
        Self {
            counter,
            sink,
            clock,
            monitor,
        }
    }
}
