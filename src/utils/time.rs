use chrono::{DateTime, Utc};

/// Injected time source. Every wall-clock read in the core goes through this
/// trait so tests can drive token expiry and rate-limit windows manually.
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
