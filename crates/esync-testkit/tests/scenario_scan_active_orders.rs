//! Scenario: scan cycles over all active orders.
//!
//! # Invariants under test
//!
//! 1. decimals=6, cached 100.0, raw 99_500_000: ledger 99.5, divergence 0.5,
//!    one `high` alert with divergence 0.5, store corrected to 99.5.
//! 2. One ledger failure in a 2-order scan: total 2, failed 1, and the other
//!    order still counts as synced and mismatched.
//! 3. `synced + failed <= total` and `mismatches <= total` on a mixed set.
//! 4. Closed and canceled orders are never scanned.
//! 5. A failing metrics sink does not change the metrics or fail the scan.
//! 6. A failing active-order query fails the scan.
//! 7. At most `batch_size` ledger reads are outstanding, and groups run
//!    strictly one after another.

use std::sync::Arc;
use std::time::Duration;

use esync_reconcile::{AlertClassifier, BatchScanner, ReconciliationEngine, ScanConfig, ScanError};
use esync_schemas::{OrderStatus, Severity};
use esync_store::{LedgerError, PersistenceOutcome, StoreError};
use esync_testkit::{dec, order, order_with_status, FixedClock, InMemoryStore, ScriptedLedger};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn scanner(store: &Arc<InMemoryStore>, ledger: &Arc<ScriptedLedger>, batch_size: usize) -> BatchScanner {
    let clock = Arc::new(FixedClock::default());
    let engine = ReconciliationEngine::new(Arc::clone(ledger) as _, Arc::clone(store) as _, clock.clone());
    let classifier = AlertClassifier::new(Arc::clone(store) as _, clock.clone());
    BatchScanner::new(engine, classifier, Arc::clone(store) as _, Arc::clone(store) as _, clock)
        .with_config(ScanConfig { batch_size })
}

// ---------------------------------------------------------------------------
// 1. Six-decimal token drift
// ---------------------------------------------------------------------------

#[tokio::test]
async fn six_decimal_drift_is_corrected_and_alerted_high() {
    let store = Arc::new(InMemoryStore::with_orders([order("o1", "7", 6, dec("100.0"))]));
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_remaining(1, "7", 99_500_000);

    let report = scanner(&store, &ledger, 5).scan_active_report().await.unwrap();

    let r = &report.results[0];
    assert_eq!(r.ledger_amount, Some(dec("99.5")));
    assert_eq!(r.divergence, Some(dec("0.5")));
    assert!(r.updated);

    assert_eq!(report.alerts.alerts.len(), 1);
    let alert = &report.alerts.alerts[0];
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.divergence, dec("0.5"));
    assert_eq!(alert.order_id, "o1");
    assert_eq!(store.alerts(), report.alerts.alerts);

    assert_eq!(store.order("o1").unwrap().remaining_amount, dec("99.5"));
    assert_eq!(report.metrics.total_mismatches, 1);
    assert_eq!(report.metrics.average_divergence, dec("0.5"));
}

// ---------------------------------------------------------------------------
// 2. Partial ledger failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_ledger_failure_does_not_hide_the_other_order() {
    let store = Arc::new(InMemoryStore::with_orders([
        order("a", "1", 6, dec("10")),
        order("b", "2", 6, dec("10")),
    ]));
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.fail_order(1, "1", LedgerError::Unavailable("timeout".to_string()));
    ledger.set_remaining(1, "2", 9_000_000);

    let m = scanner(&store, &ledger, 5).scan_active().await.unwrap();

    assert_eq!(m.total_orders, 2);
    assert_eq!(m.failed_orders, 1);
    assert_eq!(m.synced_orders, 1);
    assert_eq!(m.total_mismatches, 1);
    assert_eq!(store.order("b").unwrap().remaining_amount, dec("9"));
    assert_eq!(store.order("a").unwrap().remaining_amount, dec("10"));
}

// ---------------------------------------------------------------------------
// 3-4. Count invariants and active filter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn counts_stay_within_total_across_groups() {
    let mut orders = Vec::new();
    let ledger = Arc::new(ScriptedLedger::new());
    for i in 0..12u32 {
        let id = format!("o{i}");
        let chain_order = i.to_string();
        orders.push(order(&id, &chain_order, 6, dec("1")));
        match i % 4 {
            0 => ledger.fail_order(1, &chain_order, LedgerError::Decode("bad word".to_string())),
            1 => ledger.set_remaining(1, &chain_order, 1_000_000),
            2 => ledger.set_remaining(1, &chain_order, 1_005_000),
            _ => ledger.set_remaining(1, &chain_order, 2_000_000),
        }
    }
    orders.push(order_with_status("closed", dec("1"), OrderStatus::Closed));
    orders.push(order_with_status("canceled", dec("1"), OrderStatus::Canceled));
    orders.push(order_with_status("pending", dec("1"), OrderStatus::Pending));
    ledger.set_remaining(1, "pending", 1_000_000);
    let store = Arc::new(InMemoryStore::with_orders(orders));

    let report = scanner(&store, &ledger, 5).scan_active_report().await.unwrap();
    let m = &report.metrics;

    assert_eq!(m.total_orders, 13);
    assert_eq!(m.failed_orders, 3);
    assert_eq!(m.synced_orders, 6);
    assert_eq!(m.total_mismatches, 6);
    assert!(m.synced_orders + m.failed_orders <= m.total_orders);
    assert!(m.total_mismatches <= m.total_orders);

    // 0.005 is low: counted, never alerted.
    assert_eq!(report.alerts.low_count, 3);
    assert_eq!(report.alerts.alerts.len(), 3);
    assert!(report.alerts.alerts.iter().all(|a| a.severity == Severity::High));

    assert!(report.results.iter().all(|r| r.order_id != "closed" && r.order_id != "canceled"));
    assert_eq!(ledger.order_reads(), 13);
}

#[tokio::test]
async fn empty_scan_is_zeroed_and_skips_persistence() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(ScriptedLedger::new());

    let report = scanner(&store, &ledger, 5).scan_active_report().await.unwrap();

    assert_eq!(report.metrics.total_orders, 0);
    assert_eq!(report.metrics_persistence, PersistenceOutcome::Skipped);
    assert!(store.scan_metrics().is_none());
}

// ---------------------------------------------------------------------------
// 5-6. Persistence and query failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_sink_failure_is_reported_not_raised() {
    let store = Arc::new(InMemoryStore::with_orders([order("o1", "7", 6, dec("100"))]));
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_remaining(1, "7", 99_500_000);
    store.fail_metrics(StoreError::PermissionDenied("metrics role".to_string()));
    store.fail_alerts(StoreError::Unavailable("alerts down".to_string()));

    let report = scanner(&store, &ledger, 5).scan_active_report().await.unwrap();

    assert_eq!(report.metrics.synced_orders, 1);
    assert!(report.metrics_persistence.is_failed());
    assert!(report.alerts.persistence.is_failed());
    assert_eq!(report.alerts.alerts.len(), 1);
    assert!(store.scan_metrics().is_none());
}

#[tokio::test]
async fn failing_active_query_fails_the_scan() {
    let store = Arc::new(InMemoryStore::new());
    store.fail_queries(StoreError::Unavailable("pool exhausted".to_string()));
    let ledger = Arc::new(ScriptedLedger::new());

    let err = scanner(&store, &ledger, 5).scan_active().await.unwrap_err();
    assert!(matches!(err, ScanError::Query(StoreError::Unavailable(_))));
}

// ---------------------------------------------------------------------------
// 7. Group concurrency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn ledger_reads_run_in_sequential_groups_of_five() {
    let delay = Duration::from_millis(100);
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_delay(Some(delay));
    let mut orders = Vec::new();
    for i in 0..12u32 {
        let chain_order = i.to_string();
        orders.push(order(&format!("o{i}"), &chain_order, 6, dec("1")));
        ledger.set_remaining(1, &chain_order, 1_000_000);
    }
    let store = Arc::new(InMemoryStore::with_orders(orders));
    let s = scanner(&store, &ledger, 5);

    let start = tokio::time::Instant::now();
    let observe = async {
        let mut seen = Vec::new();
        for at_ms in [50, 150, 250] {
            tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
            seen.push(ledger.order_reads());
        }
        seen
    };
    let (scan, seen) = tokio::join!(s.scan_active(), observe);

    // Nothing lands before the first group completes; each group adds 5.
    assert_eq!(seen, vec![0, 5, 10]);
    assert_eq!(scan.unwrap().total_orders, 12);
    assert_eq!(ledger.order_reads(), 12);
    // ceil(12 / 5) groups of one delay each.
    assert_eq!(start.elapsed(), delay * 3);
}
