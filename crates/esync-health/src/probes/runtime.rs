use std::sync::Arc;

use esync_schemas::ComponentStatus;
use tokio::time::Instant;

use crate::{HealthProbe, ProbeError, ProbeReport};

/// Source of the process's resident memory.
pub trait MemorySampler: Send + Sync {
    /// `None` when the platform offers no sample.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Reads `VmRSS` from `/proc/self/status` (Linux).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcSelfStatus;

impl MemorySampler for ProcSelfStatus {
    fn resident_bytes(&self) -> Option<u64> {
        let text = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss_bytes(&text)
    }
}

/// Constant sample, for tests and platforms without `/proc`.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemory(pub Option<u64>);

impl MemorySampler for FixedMemory {
    fn resident_bytes(&self) -> Option<u64> {
        self.0
    }
}

/// Parse the `VmRSS:   12345 kB` line.
pub fn parse_vm_rss_bytes(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut parts = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => value.checked_mul(1024),
        _ => None,
    }
}

/// Resident memory plus executor scheduling lag.
pub struct PerformanceProbe {
    memory: Arc<dyn MemorySampler>,
    warn_mb: u64,
    critical_mb: u64,
    lag_warn_ms: u64,
}

impl PerformanceProbe {
    pub fn new(memory: Arc<dyn MemorySampler>, warn_mb: u64, critical_mb: u64, lag_warn_ms: u64) -> Self {
        Self {
            memory,
            warn_mb,
            critical_mb,
            lag_warn_ms,
        }
    }
}

#[async_trait::async_trait]
impl HealthProbe for PerformanceProbe {
    fn component(&self) -> &str {
        "performance"
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        // Time for the executor to hand control back after a yield.
        let started = Instant::now();
        tokio::task::yield_now().await;
        let lag_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let Some(bytes) = self.memory.resident_bytes() else {
            return Ok(ProbeReport::degraded(
                ComponentStatus::Unknown,
                "resident memory not available on this platform",
            )
            .detail("scheduler_lag_ms", lag_ms));
        };
        let mb = bytes / (1024 * 1024);

        let report = if mb >= self.critical_mb {
            ProbeReport::degraded(
                ComponentStatus::Critical,
                format!("resident memory {mb} MB >= {} MB", self.critical_mb),
            )
        } else if mb >= self.warn_mb {
            ProbeReport::degraded(
                ComponentStatus::Warning,
                format!("resident memory {mb} MB >= {} MB", self.warn_mb),
            )
        } else if lag_ms > self.lag_warn_ms {
            ProbeReport::degraded(
                ComponentStatus::Warning,
                format!("scheduler lag {lag_ms} ms"),
            )
        } else {
            ProbeReport::healthy()
        };

        Ok(report
            .detail("resident_mb", mb)
            .detail("scheduler_lag_ms", lag_ms))
    }
}
