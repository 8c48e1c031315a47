use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps stamped into records and metrics.
///
/// Elapsed-time measurements use `tokio::time::Instant` instead so that
/// paused-clock tests stay deterministic.
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
