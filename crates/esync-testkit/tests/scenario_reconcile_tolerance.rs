//! Scenario: single-order reconciliation against the ledger.
//!
//! # Invariants under test
//!
//! 1. Divergence within 1e-6 returns `updated=false` and leaves the cached
//!    record byte-identical.
//! 2. Divergence above 1e-6 overwrites the cache with the ledger amount
//!    exactly and stamps the ledger sync marker.
//! 3. `force_update` writes even when divergence is exactly zero.
//! 4. Ledger failure and a missing record are reported in the result, never
//!    as a panic or error, and never touch the store.

use std::sync::Arc;

use esync_reconcile::{ReconcileRequest, ReconciliationEngine, SyncError};
use esync_schemas::SYNC_SOURCE_LEDGER;
use esync_store::LedgerError;
use esync_testkit::{dec, order, t0, FixedClock, InMemoryStore, ScriptedLedger};

fn harness(cached: &str, raw: u128) -> (Arc<InMemoryStore>, Arc<ScriptedLedger>, ReconciliationEngine) {
    let store = Arc::new(InMemoryStore::with_orders([order("o1", "7", 6, dec(cached))]));
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_remaining(1, "7", raw);
    let engine = ReconciliationEngine::new(
        Arc::clone(&ledger) as _,
        Arc::clone(&store) as _,
        Arc::new(FixedClock::default()),
    );
    (store, ledger, engine)
}

fn req() -> ReconcileRequest {
    ReconcileRequest {
        order_id: "o1".to_string(),
        on_chain_id: "7".to_string(),
        token_decimals: 6,
        chain_id: 1,
    }
}

#[tokio::test]
async fn divergence_within_tolerance_leaves_store_identical() {
    // ledger 100.000001 vs cached 100: divergence == tolerance
    let (store, _ledger, engine) = harness("100", 100_000_001);
    let before = store.order("o1").unwrap();

    let r = engine.reconcile(&req(), false).await;

    assert!(r.success);
    assert!(!r.updated);
    assert_eq!(r.divergence, Some(dec("0.000001")));
    assert_eq!(store.order("o1").unwrap(), before);
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn divergence_above_tolerance_overwrites_with_ledger_amount() {
    let (store, _ledger, engine) = harness("100", 100_000_002);

    let r = engine.reconcile(&req(), false).await;

    assert!(r.success && r.updated);
    let after = store.order("o1").unwrap();
    assert_eq!(after.remaining_amount, dec("100.000002"));
    assert_eq!(after.sync_source.as_deref(), Some(SYNC_SOURCE_LEDGER));
    assert_eq!(after.last_synced_at, Some(t0()));
}

#[tokio::test]
async fn force_update_writes_even_without_divergence() {
    let (store, _ledger, engine) = harness("42", 42_000_000);

    let r = engine.reconcile(&req(), true).await;

    assert!(r.updated);
    assert_eq!(r.divergence, Some(dec("0")));
    assert_eq!(store.update_calls(), 1);
    assert_eq!(store.order("o1").unwrap().sync_source.as_deref(), Some(SYNC_SOURCE_LEDGER));
}

#[tokio::test]
async fn ledger_failure_is_a_result_not_a_write() {
    let (store, ledger, engine) = harness("100", 0);
    ledger.fail_order(1, "7", LedgerError::Unavailable("rpc down".to_string()));

    let r = engine.reconcile(&req(), true).await;

    assert!(!r.success);
    assert!(matches!(r.error, Some(SyncError::LedgerUnavailable(_))));
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn missing_record_is_reported() {
    let (_store, ledger, _engine) = harness("1", 1);
    let empty = Arc::new(InMemoryStore::new());
    let engine = ReconciliationEngine::new(ledger, empty, Arc::new(FixedClock::default()));

    let r = engine.reconcile(&req(), false).await;

    assert_eq!(r.error, Some(SyncError::RecordNotFound("o1".to_string())));
    assert!(!r.success);
}

#[tokio::test]
async fn rejected_write_marks_result_failed() {
    let (store, _ledger, engine) = harness("100", 50_000_000);
    store.reject_update_of("o1");

    let r = engine.reconcile(&req(), false).await;

    assert!(!r.success);
    assert!(!r.updated);
    assert!(matches!(r.error, Some(SyncError::Persistence(_))));
    assert_eq!(store.order("o1").unwrap().remaining_amount, dec("100"));
}
