use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use fw_integrity::{StreakTick, ViolationCounter};
use fw_schemas::EngineError;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u64,
    expires_at: Instant,
}

/// Single-process stand-in for the Redis counter. Expiry is checked lazily on
/// access.
#[derive(Debug, Default)]
pub struct InMemoryViolationCounter {
    entries: Mutex<HashMap<String, Entry>>,
    failing: AtomicBool,
    /// Delay between applying a violation and replying, in ms.
    reply_delay_ms: AtomicU64,
}

impl InMemoryViolationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Apply violations but hold the reply back, like a store that ran the
    /// script and then lost the connection.
    pub fn set_reply_delay(&self, delay: Duration) {
        self.reply_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn reply<T>(&self, value: T) -> T {
        let ms = self.reply_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        value
    }

    fn check_up(&self) -> Result<(), EngineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Infrastructure("counter store unavailable".to_string()));
        }
        Ok(())
    }
}

fn live(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<Entry> {
    match entries.get(key).copied() {
        Some(e) if e.expires_at > now => Some(e),
        Some(_) => {
            entries.remove(key);
            None
        }
        None => None,
    }
}

#[async_trait::async_trait]
impl ViolationCounter for InMemoryViolationCounter {
    async fn record_violation(
        &self,
        key: &str,
        ttl: Duration,
        threshold: u64,
    ) -> Result<StreakTick, EngineError> {
        self.check_up()?;
        let now = Instant::now();
        let tick = {
            let mut entries = self.entries.lock().await;
            let count = live(&mut entries, key, now).map_or(0, |e| e.count) + 1;
            let crossed = count >= threshold;
            if crossed {
                entries.remove(key);
            } else {
                entries.insert(
                    key.to_string(),
                    Entry {
                        count,
                        expires_at: now + ttl,
                    },
                );
            }
            StreakTick { count, crossed }
        };
        Ok(self.reply(tick).await)
    }

    async fn count(&self, key: &str) -> Result<u64, EngineError> {
        self.check_up()?;
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key, Instant::now()).map_or(0, |e| e.count))
    }

    async fn clear(&self, key: &str) -> Result<(), EngineError> {
        self.check_up()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
