use std::sync::Arc;

use chrono::{DateTime, Utc};
use esync_schemas::ScanMetrics;
use esync_store::{Clock, MetricsSink, OffchainStore, OrderFilter, PersistenceOutcome, StoreError};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{AlertBatch, AlertClassifier, ReconcileRequest, ReconciliationEngine, SyncResult};

/// Default number of reconciliations in flight at once.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Reconciliations issued per group; the next group waits for this one.
    pub batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("active order query failed: {0}")]
    Query(#[from] StoreError),
}

/// Everything one scan cycle produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub metrics: ScanMetrics,
    pub results: Vec<SyncResult>,
    pub alerts: AlertBatch,
    pub metrics_persistence: PersistenceOutcome,
}

/// Aggregate per-order results into cycle metrics. Pure.
pub fn aggregate_metrics(results: &[SyncResult], timestamp: DateTime<Utc>) -> ScanMetrics {
    let total_orders = results.len() as u64;
    let synced_orders = results.iter().filter(|r| r.success && r.updated).count() as u64;
    let failed_orders = results.iter().filter(|r| !r.success).count() as u64;

    let mismatches: Vec<Decimal> = results
        .iter()
        .filter(|r| r.is_mismatch())
        .filter_map(|r| r.divergence)
        .collect();
    let total_mismatches = mismatches.len() as u64;
    let average_divergence = if mismatches.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = mismatches.iter().copied().sum();
        (sum / Decimal::from(total_mismatches)).normalize()
    };

    ScanMetrics {
        total_orders,
        synced_orders,
        failed_orders,
        total_mismatches,
        average_divergence,
        timestamp,
    }
}

/// Reconciles every active order, `batch_size` at a time.
#[derive(Clone)]
pub struct BatchScanner {
    engine: ReconciliationEngine,
    classifier: AlertClassifier,
    store: Arc<dyn OffchainStore>,
    metrics_sink: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    config: ScanConfig,
}

impl BatchScanner {
    pub fn new(
        engine: ReconciliationEngine,
        classifier: AlertClassifier,
        store: Arc<dyn OffchainStore>,
        metrics_sink: Arc<dyn MetricsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            classifier,
            store,
            metrics_sink,
            clock,
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> ScanConfig {
        self.config
    }

    pub async fn scan_active(&self) -> Result<ScanMetrics, ScanError> {
        Ok(self.scan_active_report().await?.metrics)
    }

    /// One full scan cycle.
    ///
    /// Only the initial active-order query can fail the scan; per-order
    /// failures are counted, and metrics/alert persistence failures are
    /// logged and reported without changing the metrics.
    pub async fn scan_active_report(&self) -> Result<ScanReport, ScanError> {
        let orders = self.store.query_orders(&OrderFilter::active()).await?;

        if orders.is_empty() {
            debug!("scan: no active orders");
            return Ok(ScanReport {
                metrics: ScanMetrics::zeroed(self.clock.now()),
                results: Vec::new(),
                alerts: AlertBatch {
                    alerts: Vec::new(),
                    low_count: 0,
                    persistence: PersistenceOutcome::Skipped,
                },
                metrics_persistence: PersistenceOutcome::Skipped,
            });
        }

        let requests: Vec<ReconcileRequest> = orders.iter().map(ReconcileRequest::for_order).collect();
        let batch_size = self.config.batch_size.max(1);
        let mut results: Vec<SyncResult> = Vec::with_capacity(requests.len());

        for (i, group) in requests.chunks(batch_size).enumerate() {
            debug!(group = i, size = group.len(), "scan: reconciling group");
            let outcomes = join_all(group.iter().map(|req| self.engine.reconcile(req, false))).await;
            results.extend(outcomes);
        }

        let metrics = aggregate_metrics(&results, self.clock.now());
        info!(
            total = metrics.total_orders,
            synced = metrics.synced_orders,
            failed = metrics.failed_orders,
            mismatches = metrics.total_mismatches,
            average_divergence = %metrics.average_divergence,
            "scan complete"
        );

        let metrics_persistence = PersistenceOutcome::record(
            "scan_metrics",
            self.metrics_sink.put_scan_metrics(&metrics).await,
        );
        let alerts = self.classifier.generate_alerts(&results).await;

        Ok(ScanReport {
            metrics,
            results,
            alerts,
            metrics_persistence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncError;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn ok(id: &str, divergence: &str, updated: bool) -> SyncResult {
        SyncResult {
            order_id: id.to_string(),
            on_chain_id: id.to_string(),
            success: true,
            updated,
            ledger_amount: Some(Decimal::ONE),
            store_amount: Some(Decimal::ONE),
            divergence: Some(Decimal::from_str(divergence).unwrap()),
            error: None,
        }
    }

    fn failed(id: &str) -> SyncResult {
        SyncResult {
            order_id: id.to_string(),
            on_chain_id: id.to_string(),
            success: false,
            updated: false,
            ledger_amount: None,
            store_amount: None,
            divergence: None,
            error: Some(SyncError::LedgerUnavailable("timeout".to_string())),
        }
    }

    #[test]
    fn empty_results_aggregate_to_zero() {
        assert_eq!(aggregate_metrics(&[], ts()), ScanMetrics::zeroed(ts()));
    }

    #[test]
    fn aggregate_counts_and_average() {
        let results = vec![
            ok("a", "0.5", true),
            ok("b", "0", false),
            ok("c", "0.1", true),
            failed("d"),
        ];
        let m = aggregate_metrics(&results, ts());
        assert_eq!(m.total_orders, 4);
        assert_eq!(m.synced_orders, 2);
        assert_eq!(m.failed_orders, 1);
        assert_eq!(m.total_mismatches, 2);
        assert_eq!(m.average_divergence, Decimal::from_str("0.3").unwrap());
        assert!(m.synced_orders + m.failed_orders <= m.total_orders);
        assert!(m.total_mismatches <= m.total_orders);
    }

    #[test]
    fn sub_tolerance_divergence_counts_as_mismatch_but_not_synced() {
        let m = aggregate_metrics(&[ok("a", "0.0000005", false)], ts());
        assert_eq!(m.total_mismatches, 1);
        assert_eq!(m.synced_orders, 0);
    }
}
