use std::sync::Arc;
use std::time::Duration;

use esync_health::{HealthAggregator, HealthCheckReport, HealthHistory};
use esync_schemas::{SystemHealth, UptimeStats};
use tokio::sync::broadcast;

use crate::{Cycle, MonitorEvent, PeriodicScheduler};

pub(crate) struct HealthCycle {
    aggregator: HealthAggregator,
    events: broadcast::Sender<MonitorEvent>,
}

#[async_trait::async_trait]
impl Cycle for HealthCycle {
    type Output = HealthCheckReport;

    fn name(&self) -> &'static str {
        "health"
    }

    async fn run_cycle(&self) -> HealthCheckReport {
        let report = self.aggregator.check_all_report().await;
        let _ = self.events.send(MonitorEvent::HealthChecked {
            overall: report.health.overall,
            check_duration_ms: report.health.check_duration_ms,
            last_updated: report.health.last_updated,
        });
        report
    }
}

/// Periodic system health checks, independent of reconciliation.
pub struct HealthMonitor {
    scheduler: PeriodicScheduler<HealthCycle>,
    history: Arc<HealthHistory>,
    events: broadcast::Sender<MonitorEvent>,
}

impl HealthMonitor {
    pub fn new(
        aggregator: HealthAggregator,
        events: broadcast::Sender<MonitorEvent>,
        default_interval: Duration,
    ) -> Self {
        let history = aggregator.history();
        let cycle = Arc::new(HealthCycle {
            aggregator,
            events: events.clone(),
        });
        Self {
            scheduler: PeriodicScheduler::new(cycle, default_interval),
            history,
            events,
        }
    }

    pub async fn start(&self, interval_ms: Option<u64>) -> bool {
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

    pub fn stop(&self) -> bool {
        let stopped = self.scheduler.stop();
        if stopped {
            self.announce();
        }
        stopped
    }

    fn announce(&self) {
        let _ = self.events.send(MonitorEvent::SchedulerStateChanged {
            scheduler: "health".to_string(),
            active: self.scheduler.is_active(),
            interval_ms: self.interval_ms(),
        });
    }

    /// One health cycle now, serialized with the timer.
    pub async fn check_now(&self) -> SystemHealth {
        self.scheduler.trigger_now().await.health
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.scheduler.interval().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn get_current_health(&self) -> Option<SystemHealth> {
        self.history.latest()
    }

    pub fn get_health_history(&self) -> Vec<SystemHealth> {
        self.history.snapshot()
    }

    pub fn get_uptime_stats(&self) -> UptimeStats {
        self.history.uptime_stats()
    }
}
