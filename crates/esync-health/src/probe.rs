use std::time::Duration;

use chrono::{DateTime, Utc};
use esync_schemas::{ComponentStatus, HealthStatus};
use esync_store::{LedgerError, StoreError};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;

/// Failure of a probe's underlying check. Always converted into a
/// `critical` status by [`run_probe`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// What a probe observed. Timing and timestamps are added by [`run_probe`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub status: ComponentStatus,
    pub error: Option<String>,
    pub details: Map<String, Value>,
}

impl ProbeReport {
    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy)
    }

    pub fn with_status(status: ComponentStatus) -> Self {
        Self {
            status,
            error: None,
            details: Map::new(),
        }
    }

    /// A degraded report carrying a human-readable reason.
    pub fn degraded(status: ComponentStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(reason.into()),
            details: Map::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    /// Stable component name, e.g. `"database"`.
    fn component(&self) -> &str;

    async fn probe(&self) -> Result<ProbeReport, ProbeError>;
}

/// Run one probe under `timeout`, timing it and folding every failure into a
/// `critical` status.
pub async fn run_probe(
    probe: &dyn HealthProbe,
    timeout: Duration,
    now: impl FnOnce() -> DateTime<Utc>,
) -> HealthStatus {
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, probe.probe()).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let last_check = now();
    let component = probe.component().to_string();

    match outcome {
        Ok(Ok(report)) => HealthStatus {
            component,
            status: report.status,
            response_time_ms: Some(elapsed_ms),
            last_check,
            error: report.error,
            details: report.details,
        },
        Ok(Err(e)) => {
            tracing::warn!(component = %component, error = %e, "health probe failed");
            HealthStatus::critical(component, e.to_string(), Some(elapsed_ms), last_check)
        }
        Err(_) => {
            let msg = format!("probe timed out after {} ms", timeout.as_millis());
            tracing::warn!(component = %component, "{msg}");
            HealthStatus::critical(component, msg, Some(elapsed_ms), last_check)
        }
    }
}
