use chrono::{DateTime, Utc};

/// Source of "now" for the services.
///
/// Pure logic takes `now` as an argument; only the services read a clock, so
/// tests can pin time without touching the decision code.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
