use std::sync::Arc;

use esync_schemas::{MismatchAlert, Severity};
use esync_store::{AlertSink, Clock, PersistenceOutcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::SyncResult;

/// Absolute divergence thresholds (token units).
///
/// Absolute, not value-normalized: a 0.1 gap means the same for every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub medium: Decimal,
    pub high: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            medium: Decimal::new(1, 2), // 0.01
            high: Decimal::new(1, 1),   // 0.1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid alert thresholds: require 0 < medium ({medium}) <= high ({high})")]
pub struct InvalidThresholds {
    pub medium: Decimal,
    pub high: Decimal,
}

impl AlertThresholds {
    pub fn new(medium: Decimal, high: Decimal) -> Result<Self, InvalidThresholds> {
        if medium <= Decimal::ZERO || medium > high {
            return Err(InvalidThresholds { medium, high });
        }
        Ok(Self { medium, high })
    }

    pub fn classify(&self, divergence: Decimal) -> Severity {
        if divergence >= self.high {
            Severity::High
        } else if divergence >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Classify with the default thresholds.
pub fn classify(divergence: Decimal) -> Severity {
    AlertThresholds::default().classify(divergence)
}

/// Alerts produced from one set of results, and what happened when they were
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertBatch {
    pub alerts: Vec<MismatchAlert>,
    /// Mismatches classified `low`: counted, never alerted.
    pub low_count: usize,
    pub persistence: PersistenceOutcome,
}

#[derive(Clone)]
pub struct AlertClassifier {
    sink: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    thresholds: AlertThresholds,
}

impl AlertClassifier {
    pub fn new(sink: Arc<dyn AlertSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            thresholds: AlertThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// Medium/high alerts for successful, divergent results. Pure.
    pub fn build_alerts(&self, results: &[SyncResult]) -> (Vec<MismatchAlert>, usize) {
        let now = self.clock.now();
        let mut alerts = Vec::new();
        let mut low_count = 0usize;

        for r in results.iter().filter(|r| r.is_mismatch()) {
            let (Some(divergence), Some(store_amount), Some(ledger_amount)) =
                (r.divergence, r.store_amount, r.ledger_amount)
            else {
                continue;
            };
            let severity = self.thresholds.classify(divergence);
            if severity == Severity::Low {
                low_count += 1;
                continue;
            }
            alerts.push(MismatchAlert {
                id: Uuid::new_v4(),
                order_id: r.order_id.clone(),
                on_chain_id: r.on_chain_id.clone(),
                store_amount,
                ledger_amount,
                divergence,
                severity,
                timestamp: now,
                resolved: false,
            });
        }

        (alerts, low_count)
    }

    /// Classify results and persist the non-low alerts as one atomic write.
    ///
    /// A rejected write is logged and reported in `persistence`; the alerts
    /// are still returned.
    pub async fn generate_alerts(&self, results: &[SyncResult]) -> AlertBatch {
        let (alerts, low_count) = self.build_alerts(results);

        if alerts.is_empty() {
            return AlertBatch {
                alerts,
                low_count,
                persistence: PersistenceOutcome::Skipped,
            };
        }

        for a in &alerts {
            warn!(
                order_id = %a.order_id,
                on_chain_id = %a.on_chain_id,
                divergence = %a.divergence,
                severity = a.severity.as_str(),
                "balance mismatch alert"
            );
        }

        let persistence =
            PersistenceOutcome::record("mismatch_alerts", self.sink.write_alerts(&alerts).await);
        if !persistence.is_failed() {
            info!(count = alerts.len(), "mismatch alerts persisted");
        }

        AlertBatch {
            alerts,
            low_count,
            persistence,
        }
    }
}
