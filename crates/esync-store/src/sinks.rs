use esync_schemas::{MismatchAlert, ScanMetrics, SystemHealth};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::StoreError;

/// Durable storage for the latest scan metrics and health snapshot.
///
/// Both writes have overwrite semantics: the sink keeps one current value.
#[async_trait::async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_scan_metrics(&self, metrics: &ScanMetrics) -> Result<(), StoreError>;

    async fn put_system_health(&self, health: &SystemHealth) -> Result<(), StoreError>;
}

/// Durable storage for mismatch alerts.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Persist all alerts as one atomic write.
    async fn write_alerts(&self, alerts: &[MismatchAlert]) -> Result<(), StoreError>;
}

/// Outcome of a side-effect write whose failure must not fail the enclosing
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    Persisted,
    /// Nothing to write.
    Skipped,
    Failed { kind: String, message: String },
}

impl PersistenceOutcome {
    /// Convert a sink result, logging failures with their kind.
    pub fn record(what: &str, res: Result<(), StoreError>) -> Self {
        match res {
            Ok(()) => PersistenceOutcome::Persisted,
            Err(e) => {
                warn!(target: "esync::persistence", what, kind = e.kind(), error = %e, "persistence failed");
                PersistenceOutcome::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PersistenceOutcome::Failed { .. })
    }
}
