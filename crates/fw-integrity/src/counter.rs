use std::time::Duration;

use fw_schemas::{EngineError, IntegrityAlert};
use serde::{Deserialize, Serialize};

/// Result of one violating tick against the streak counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTick {
    /// Post-increment count.
    pub count: u64,
    /// `count >= threshold`; the counter has already been deleted.
    pub crossed: bool,
}

/// TTL-capable counter store keyed by driver, shared across instances.
#[async_trait::async_trait]
pub trait ViolationCounter: Send + Sync {
    /// Atomically: increment `key`, (re)set its TTL to `ttl`, and if the new
    /// count reaches `threshold` delete the key. No other call on the same key
    /// may interleave.
    async fn record_violation(
        &self,
        key: &str,
        ttl: Duration,
        threshold: u64,
    ) -> Result<StreakTick, EngineError>;

    /// Current count; 0 when the key is absent or expired.
    async fn count(&self, key: &str) -> Result<u64, EngineError>;

    async fn clear(&self, key: &str) -> Result<(), EngineError>;
}

/// Incident-management collaborator.
#[async_trait::async_trait]
pub trait IncidentSink: Send + Sync {
    /// Returns the created incident id.
    async fn create_incident(&self, alert: &IntegrityAlert) -> Result<String, EngineError>;
}
