use std::sync::Arc;

use esync_schemas::SYNC_SOURCE_LEDGER;
use esync_store::{Clock, LedgerReader, OffchainStore, OrderFields};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{ReconcileRequest, SyncError, SyncResult, SYNC_TOLERANCE};

/// Reconciles one order's cached remaining amount against the ledger.
///
/// Never returns an error: every failure is reported inside the
/// [`SyncResult`] so the engine stays usable inside a batch.
#[derive(Clone)]
pub struct ReconciliationEngine {
    ledger: Arc<dyn LedgerReader>,
    store: Arc<dyn OffchainStore>,
    clock: Arc<dyn Clock>,
    tolerance: Decimal,
}

impl ReconciliationEngine {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        store: Arc<dyn OffchainStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            store,
            clock,
            tolerance: SYNC_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Compare ledger truth with the cached amount and overwrite the cache
    /// when they diverge beyond tolerance (or when `force_update` is set).
    pub async fn reconcile(&self, req: &ReconcileRequest, force_update: bool) -> SyncResult {
        // 1) Ledger truth.
        let snapshot = match self
            .ledger
            .read_order_remaining(req.chain_id, &req.on_chain_id)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!(order_id = %req.order_id, on_chain_id = %req.on_chain_id, error = %e, "ledger read failed");
                return SyncResult::failed(req, SyncError::LedgerUnavailable(e.to_string()));
            }
        };

        // 2) Cached record.
        let record = match self.store.get_order(&req.order_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                warn!(order_id = %req.order_id, "order record not found in store");
                return SyncResult::failed(req, SyncError::RecordNotFound(req.order_id.clone()));
            }
            Err(e) => {
                warn!(order_id = %req.order_id, kind = e.kind(), error = %e, "store read failed");
                return SyncResult::failed(req, SyncError::StoreUnavailable(e.to_string()));
            }
        };

        // 3) Descale and compare.
        let ledger_amount = match snapshot.descale(req.token_decimals) {
            Ok(v) => v,
            Err(e) => {
                warn!(order_id = %req.order_id, raw = snapshot.raw_remaining, error = %e, "ledger amount not representable");
                return SyncResult::failed(req, SyncError::InvalidAmount(e.to_string()));
            }
        };
        let store_amount = record.remaining_amount;
        let divergence = (ledger_amount - store_amount).abs();
        let needs_sync = divergence > self.tolerance || force_update;

        let mut result = SyncResult {
            order_id: req.order_id.clone(),
            on_chain_id: req.on_chain_id.clone(),
            success: true,
            updated: false,
            ledger_amount: Some(ledger_amount),
            store_amount: Some(store_amount),
            divergence: Some(divergence),
            error: None,
        };

        if !needs_sync {
            debug!(order_id = %req.order_id, %divergence, "order in sync");
            return result;
        }

        // 4) Overwrite the cache with ledger truth.
        let now = self.clock.now();
        let fields = OrderFields {
            remaining_amount: Some(ledger_amount),
            last_synced_at: Some(now),
            sync_source: Some(SYNC_SOURCE_LEDGER.to_string()),
            updated_at: Some(now),
            ..OrderFields::default()
        };
        if let Err(e) = self.store.update_order(&req.order_id, &fields).await {
            warn!(order_id = %req.order_id, kind = e.kind(), error = %e, "reconciliation write failed");
            result.success = false;
            result.error = Some(SyncError::Persistence(e.to_string()));
            return result;
        }

        info!(
            order_id = %req.order_id,
            %store_amount,
            %ledger_amount,
            %divergence,
            forced = force_update,
            "order reconciled to ledger"
        );
        result.updated = true;
        result
    }
}
