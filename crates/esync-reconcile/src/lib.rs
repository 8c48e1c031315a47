//! esync-reconcile
//!
//! Ledger-vs-store reconciliation:
//! - [`ReconciliationEngine`] repairs one order's cached amount.
//! - [`AlertClassifier`] maps divergence to severity and persists alerts.
//! - [`BatchScanner`] drives bounded-concurrency reconciliation over every
//!   active order and aggregates [`esync_schemas::ScanMetrics`].
//!
//! Expected divergence and missing records are values inside [`SyncResult`],
//! never errors: a scan must tolerate them order by order.

mod alerts;
mod engine;
mod scanner;
mod types;

pub use alerts::{classify, AlertBatch, AlertClassifier, AlertThresholds, InvalidThresholds};
pub use engine::ReconciliationEngine;
pub use scanner::{
    aggregate_metrics, BatchScanner, ScanConfig, ScanError, ScanReport, DEFAULT_SCAN_BATCH_SIZE,
};
pub use types::*;
