use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Divergence at or below this is treated as in sync (1e-6 token units).
pub const SYNC_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Identity of one order to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub order_id: String,
    pub on_chain_id: String,
    pub token_decimals: u32,
    pub chain_id: u64,
}

impl ReconcileRequest {
    pub fn for_order(order: &esync_schemas::OrderRecord) -> Self {
        Self {
            order_id: order.id.clone(),
            on_chain_id: order.on_chain_id.clone(),
            token_decimals: order.token_decimals,
            chain_id: order.chain_id,
        }
    }
}

/// Why a reconciliation did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SyncError {
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("store read failed: {0}")]
    StoreUnavailable(String),

    #[error("invalid ledger amount: {0}")]
    InvalidAmount(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Outcome of reconciling one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub order_id: String,
    pub on_chain_id: String,
    pub success: bool,
    /// Store was overwritten with the ledger amount.
    pub updated: bool,
    pub ledger_amount: Option<Decimal>,
    pub store_amount: Option<Decimal>,
    pub divergence: Option<Decimal>,
    pub error: Option<SyncError>,
}

impl SyncResult {
    pub(crate) fn failed(req: &ReconcileRequest, error: SyncError) -> Self {
        Self {
            order_id: req.order_id.clone(),
            on_chain_id: req.on_chain_id.clone(),
            success: false,
            updated: false,
            ledger_amount: None,
            store_amount: None,
            divergence: None,
            error: Some(error),
        }
    }

    /// Successful and divergent by any positive amount.
    pub fn is_mismatch(&self) -> bool {
        self.success && self.divergence.map_or(false, |d| d > Decimal::ZERO)
    }
}
