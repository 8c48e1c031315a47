use std::sync::Arc;

use esync_store::{LedgerError, LedgerReader, OffchainStore, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Requested amount exceeds what the ledger still holds for the order.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("insufficient remaining amount: available {available}, required {required}")]
pub struct ValidationFailure {
    pub available: Decimal,
    pub required: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Insufficient(#[from] ValidationFailure),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("order {order_id} is not active (status {status})")]
    OrderNotActive { order_id: String, status: String },

    #[error("requested amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ledger amount not representable: {0}")]
    InvalidAmount(String),
}

/// Amounts compared by a passing validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountCheck {
    pub order_id: String,
    pub available: Decimal,
    pub required: Decimal,
}

/// Validates trade requests against ledger truth, not the cache.
#[derive(Clone)]
pub struct TradeValidator {
    ledger: Arc<dyn LedgerReader>,
    store: Arc<dyn OffchainStore>,
}

impl TradeValidator {
    pub fn new(ledger: Arc<dyn LedgerReader>, store: Arc<dyn OffchainStore>) -> Self {
        Self { ledger, store }
    }

    pub async fn validate_trade_amount(
        &self,
        order_id: &str,
        required: Decimal,
    ) -> Result<AmountCheck, ValidationError> {
        if required <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(required));
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ValidationError::OrderNotFound(order_id.to_string()))?;
        if !order.status.is_active() {
            return Err(ValidationError::OrderNotActive {
                order_id: order_id.to_string(),
                status: order.status.as_str().to_string(),
            });
        }

        let snapshot = self
            .ledger
            .read_order_remaining(order.chain_id, &order.on_chain_id)
            .await?;
        let available = snapshot
            .descale(order.token_decimals)
            .map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;

        debug!(order_id, %available, %required, "trade amount check");
        if available < required {
            return Err(ValidationFailure {
                available,
                required,
            }
            .into());
        }

        Ok(AmountCheck {
            order_id: order_id.to_string(),
            available,
            required,
        })
    }
}
