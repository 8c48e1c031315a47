use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esync_reconcile::{BatchScanner, ScanError, ScanReport};
use esync_schemas::ScanMetrics;
use esync_store::Clock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::{Cycle, MonitorEvent, PeriodicScheduler};

/// Scan metrics retained in memory, newest last.
pub const SCAN_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub active: bool,
    pub interval_ms: u64,
    pub last_scan: Option<ScanMetrics>,
    pub scans_recorded: usize,
}

pub(crate) struct ScanCycle {
    scanner: BatchScanner,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<MonitorEvent>,
    history: Mutex<VecDeque<ScanMetrics>>,
}

impl ScanCycle {
    fn history(&self) -> std::sync::MutexGuard<'_, VecDeque<ScanMetrics>> {
        self.history.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, metrics: &ScanMetrics) {
        let mut h = self.history();
        while h.len() >= SCAN_HISTORY_CAPACITY {
            h.pop_front();
        }
        h.push_back(metrics.clone());
    }
}

#[async_trait::async_trait]
impl Cycle for ScanCycle {
    type Output = Result<ScanReport, ScanError>;

    fn name(&self) -> &'static str {
        "reconciliation"
    }

    async fn run_cycle(&self) -> Self::Output {
        match self.scanner.scan_active_report().await {
            Ok(report) => {
                self.record(&report.metrics);
                for alert in &report.alerts.alerts {
                    let _ = self.events.send(MonitorEvent::MismatchDetected(alert.clone()));
                }
                let _ = self.events.send(MonitorEvent::ScanCompleted {
                    metrics: report.metrics.clone(),
                    alerts_raised: report.alerts.alerts.len(),
                    metrics_persistence: report.metrics_persistence.clone(),
                    alerts_persistence: report.alerts.persistence.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "reconciliation scan failed");
                let _ = self.events.send(MonitorEvent::ScanFailed {
                    error: e.to_string(),
                    ts: self.clock.now(),
                });
                Err(e)
            }
        }
    }
}

/// Periodic ledger-vs-store reconciliation over all active orders.
pub struct ReconciliationMonitor {
    scheduler: PeriodicScheduler<ScanCycle>,
    events: broadcast::Sender<MonitorEvent>,
}

impl ReconciliationMonitor {
    pub fn new(
        scanner: BatchScanner,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<MonitorEvent>,
        default_interval: Duration,
    ) -> Self {
        let cycle = Arc::new(ScanCycle {
            scanner,
            clock,
            events: events.clone(),
            history: Mutex::new(VecDeque::with_capacity(SCAN_HISTORY_CAPACITY)),
        });
        Self {
            scheduler: PeriodicScheduler::new(cycle, default_interval),
            events,
        }
    }

    /// Start periodic scanning and run the first scan before returning.
    /// Returns `false` when monitoring was already active.
    pub async fn start_monitoring(&self, interval_ms: Option<u64>) -> bool {
        let started = self
            .scheduler
            .start(interval_ms.map(Duration::from_millis))
            .await
            .is_some();
        if started {
            self.announce();
        }
        started
    }

    pub fn stop_monitoring(&self) -> bool {
        let stopped = self.scheduler.stop();
        if stopped {
            self.announce();
        }
        stopped
    }

    fn announce(&self) {
        let _ = self.events.send(MonitorEvent::SchedulerStateChanged {
            scheduler: "reconciliation".to_string(),
            active: self.scheduler.is_active(),
            interval_ms: self.interval_ms(),
        });
    }

    pub async fn trigger_manual_scan(&self) -> Result<ScanMetrics, ScanError> {
        self.trigger_manual_scan_report().await.map(|r| r.metrics)
    }

    pub async fn trigger_manual_scan_report(&self) -> Result<ScanReport, ScanError> {
        self.scheduler.trigger_now().await
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.scheduler.interval().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn get_monitoring_status(&self) -> MonitoringStatus {
        let cycle = self.scheduler.cycle();
        let history = cycle.history();
        MonitoringStatus {
            active: self.scheduler.is_active(),
            interval_ms: self.interval_ms(),
            last_scan: history.back().cloned(),
            scans_recorded: history.len(),
        }
    }

    /// Oldest first.
    pub fn scan_history(&self) -> Vec<ScanMetrics> {
        self.scheduler.cycle().history().iter().cloned().collect()
    }
}
