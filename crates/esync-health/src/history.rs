use std::collections::VecDeque;
use std::sync::Mutex;

use esync_schemas::{ComponentStatus, SystemHealth, UptimeStats};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded history of health cycles. Oldest entries are evicted first.
///
/// One writer (the aggregator); readers receive copies.
#[derive(Debug)]
pub struct HealthHistory {
    capacity: usize,
    entries: Mutex<VecDeque<SystemHealth>>,
}

impl Default for HealthHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HealthHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SystemHealth>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, health: SystemHealth) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(health);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn latest(&self) -> Option<SystemHealth> {
        self.lock().back().cloned()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<SystemHealth> {
        self.lock().iter().cloned().collect()
    }

    /// Share of retained cycles whose overall verdict was not critical.
    /// An empty history reports 0 checks and 0%.
    pub fn uptime_stats(&self) -> UptimeStats {
        let entries = self.lock();
        let total = entries.len() as u64;
        let ok = entries
            .iter()
            .filter(|h| h.overall != ComponentStatus::Critical)
            .count() as u64;
        let pct = if total == 0 {
            0.0
        } else {
            ok as f64 / total as f64 * 100.0
        };
        UptimeStats {
            uptime_percentage: pct,
            total_checks: total,
            successful_checks: ok,
        }
    }
}
