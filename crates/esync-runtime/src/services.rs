use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use esync_config::EscrowSyncConfig;
use esync_health::{
    standard_battery, HealthAggregator, HealthProbe, HealthSettings, MemorySampler, ProbeDeps,
    ProbeEndpoints,
};
use esync_reconcile::{
    AlertClassifier, AlertThresholds, BatchScanner, ReconciliationEngine, ScanConfig, ScanError,
    SYNC_TOLERANCE,
};
use esync_schemas::{OrderBalanceUpdate, ScanMetrics, SystemHealth, TradeRecord, UptimeStats};
use esync_store::{AlertSink, Clock, LedgerReader, MetricsSink, OffchainStore};
use esync_trade::{
    AmountCheck, AtomicMutationCoordinator, TradeCommit, TradeCommitError, TradeValidator,
    ValidationError,
};
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::{HealthMonitor, MonitorEvent, MonitoringStatus, ReconciliationMonitor};

const EVENT_CAPACITY: usize = 1024;

/// External collaborators every service is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn LedgerReader>,
    pub store: Arc<dyn OffchainStore>,
    pub metrics_sink: Arc<dyn MetricsSink>,
    pub alert_sink: Arc<dyn AlertSink>,
    pub clock: Arc<dyn Clock>,
    pub memory: Arc<dyn MemorySampler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub reconcile_interval: Duration,
    pub scan: ScanConfig,
    pub tolerance: Decimal,
    pub thresholds: AlertThresholds,
    pub health_interval: Duration,
    pub health: HealthSettings,
    pub chain_ids: Vec<u64>,
    pub contract_chain_id: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_millis(300_000),
            scan: ScanConfig::default(),
            tolerance: SYNC_TOLERANCE,
            thresholds: AlertThresholds::default(),
            health_interval: Duration::from_millis(60_000),
            health: HealthSettings::default(),
            chain_ids: Vec::new(),
            contract_chain_id: None,
        }
    }
}

impl RuntimeSettings {
    pub fn from_config(cfg: &EscrowSyncConfig) -> Result<Self> {
        let r = &cfg.reconciliation;
        let h = &cfg.health;
        let thresholds = AlertThresholds::new(r.alert_medium, r.alert_high)
            .context("reconciliation alert thresholds")?;

        Ok(Self {
            reconcile_interval: Duration::from_millis(r.interval_ms),
            scan: ScanConfig {
                batch_size: r.batch_size,
            },
            tolerance: r.tolerance,
            thresholds,
            health_interval: Duration::from_millis(h.interval_ms),
            health: HealthSettings {
                probe_timeout_ms: h.probe_timeout_ms,
                slow_response_ms: h.slow_response_ms,
                history_capacity: h.history_capacity,
                memory_warn_mb: h.memory_warn_mb,
                memory_critical_mb: h.memory_critical_mb,
                lag_warn_ms: h.lag_warn_ms,
                endpoints: ProbeEndpoints {
                    website: h.endpoints.website.clone(),
                    api: h.endpoints.api.clone(),
                    storage: h.endpoints.storage.clone(),
                    network: h.endpoints.network.clone(),
                },
            },
            chain_ids: cfg.chain_ids(),
            contract_chain_id: cfg.contract_chain_id(),
        })
    }
}

/// Composition root: owns both monitors and the trade path.
pub struct MonitoringServices {
    reconciliation: ReconciliationMonitor,
    health: HealthMonitor,
    coordinator: AtomicMutationCoordinator,
    validator: TradeValidator,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitoringServices {
    /// Build with the standard battery of 8 health probes.
    pub fn new(collab: Collaborators, settings: &RuntimeSettings) -> Self {
        let probes = standard_battery(
            ProbeDeps {
                store: Arc::clone(&collab.store),
                ledger: Arc::clone(&collab.ledger),
                chain_ids: settings.chain_ids.clone(),
                contract_chain_id: settings.contract_chain_id,
                memory: Arc::clone(&collab.memory),
            },
            &settings.health,
        );
        Self::with_probes(collab, settings, probes)
    }

    pub fn with_probes(
        collab: Collaborators,
        settings: &RuntimeSettings,
        probes: Vec<Arc<dyn HealthProbe>>,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);

        let engine = ReconciliationEngine::new(
            Arc::clone(&collab.ledger),
            Arc::clone(&collab.store),
            Arc::clone(&collab.clock),
        )
        .with_tolerance(settings.tolerance);
        let classifier = AlertClassifier::new(Arc::clone(&collab.alert_sink), Arc::clone(&collab.clock))
            .with_thresholds(settings.thresholds);
        let scanner = BatchScanner::new(
            engine,
            classifier,
            Arc::clone(&collab.store),
            Arc::clone(&collab.metrics_sink),
            Arc::clone(&collab.clock),
        )
        .with_config(settings.scan);

        let aggregator = HealthAggregator::new(
            probes,
            Arc::clone(&collab.metrics_sink),
            Arc::clone(&collab.clock),
            &settings.health,
        );

        Self {
            reconciliation: ReconciliationMonitor::new(
                scanner,
                Arc::clone(&collab.clock),
                events.clone(),
                settings.reconcile_interval,
            ),
            health: HealthMonitor::new(aggregator, events.clone(), settings.health_interval),
            coordinator: AtomicMutationCoordinator::new(
                Arc::clone(&collab.store),
                Arc::clone(&collab.clock),
            ),
            validator: TradeValidator::new(collab.ledger, collab.store),
            events,
        }
    }

    pub fn reconciliation(&self) -> &ReconciliationMonitor {
        &self.reconciliation
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    // --- reconciliation -----------------------------------------------------

    pub async fn start_monitoring(&self, interval_ms: Option<u64>) -> bool {
        self.reconciliation.start_monitoring(interval_ms).await
    }

    pub fn stop_monitoring(&self) -> bool {
        self.reconciliation.stop_monitoring()
    }

    pub async fn trigger_manual_scan(&self) -> Result<ScanMetrics, ScanError> {
        self.reconciliation.trigger_manual_scan().await
    }

    pub fn get_monitoring_status(&self) -> MonitoringStatus {
        self.reconciliation.get_monitoring_status()
    }

    /// Retained scan metrics, oldest first.
    pub fn get_scan_history(&self) -> Vec<ScanMetrics> {
        self.reconciliation.scan_history()
    }

    // --- health -------------------------------------------------------------

    pub fn get_current_health(&self) -> Option<SystemHealth> {
        self.health.get_current_health()
    }

    pub fn get_health_history(&self) -> Vec<SystemHealth> {
        self.health.get_health_history()
    }

    pub fn get_uptime_stats(&self) -> UptimeStats {
        self.health.get_uptime_stats()
    }

    // --- trades -------------------------------------------------------------

    pub async fn commit_trade_with_order_updates(
        &self,
        trade: TradeRecord,
        updates: &[OrderBalanceUpdate],
    ) -> Result<TradeCommit, TradeCommitError> {
        let commit = self
            .coordinator
            .commit_trade_with_order_updates(trade, updates)
            .await?;
        let _ = self.events.send(MonitorEvent::TradeCommitted {
            trade_id: commit.trade_id.clone(),
            orders_updated: commit.orders_updated.len(),
            orders_closed: commit.orders_closed.len(),
        });
        Ok(commit)
    }

    pub async fn validate_trade_amount(
        &self,
        order_id: &str,
        required: Decimal,
    ) -> Result<AmountCheck, ValidationError> {
        self.validator.validate_trade_amount(order_id, required).await
    }

    /// Stop both schedulers. In-flight cycles finish on their own.
    pub fn shutdown(&self) {
        self.reconciliation.stop_monitoring();
        self.health.stop();
    }
}
