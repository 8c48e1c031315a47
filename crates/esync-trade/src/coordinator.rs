use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use esync_schemas::{OrderBalanceUpdate, OrderStatus, TradeRecord};
use esync_store::{Clock, OffchainStore, OrderFields, StoreError, WriteOp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeCommitError {
    /// The batch was malformed and never reached the store.
    #[error("invalid trade batch: {0}")]
    Invalid(String),

    /// The store rejected the atomic write; nothing was applied.
    #[error("atomic trade write failed: {0}")]
    Store(#[from] StoreError),
}

/// Receipt of a committed trade batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCommit {
    pub trade_id: String,
    pub orders_updated: Vec<String>,
    /// Subset of `orders_updated` transitioned to CLOSED.
    pub orders_closed: Vec<String>,
    pub committed_at: DateTime<Utc>,
}

/// Build the write ops for one trade batch. Pure.
///
/// Order: trade insert first, then one update per order. An update whose new
/// remaining amount is `<= 0` also carries the CLOSED transition.
pub fn build_trade_batch(
    trade: &TradeRecord,
    updates: &[OrderBalanceUpdate],
    now: DateTime<Utc>,
) -> Result<Vec<WriteOp>, TradeCommitError> {
    if trade.id.trim().is_empty() {
        return Err(TradeCommitError::Invalid("trade id is empty".to_string()));
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for u in updates {
        if u.order_id.trim().is_empty() {
            return Err(TradeCommitError::Invalid("order update with empty order id".to_string()));
        }
        if !seen.insert(u.order_id.as_str()) {
            return Err(TradeCommitError::Invalid(format!(
                "order {} updated twice in one batch",
                u.order_id
            )));
        }
    }

    let mut ops = Vec::with_capacity(updates.len() + 1);
    ops.push(WriteOp::InsertTrade(trade.clone()));

    for u in updates {
        let closes = u.new_remaining_amount <= Decimal::ZERO;
        ops.push(WriteOp::UpdateOrder {
            order_id: u.order_id.clone(),
            fields: OrderFields {
                remaining_amount: Some(u.new_remaining_amount),
                status: closes.then_some(OrderStatus::Closed),
                updated_at: Some(now),
                ..OrderFields::default()
            },
        });
    }

    Ok(ops)
}

/// Commits a trade and its order-balance mutations atomically.
#[derive(Clone)]
pub struct AtomicMutationCoordinator {
    store: Arc<dyn OffchainStore>,
    clock: Arc<dyn Clock>,
}

impl AtomicMutationCoordinator {
    pub fn new(store: Arc<dyn OffchainStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// On `Err` the caller must treat the trade as not created.
    pub async fn commit_trade_with_order_updates(
        &self,
        trade: TradeRecord,
        updates: &[OrderBalanceUpdate],
    ) -> Result<TradeCommit, TradeCommitError> {
        let now = self.clock.now();
        let ops = build_trade_batch(&trade, updates, now)?;

        let orders_closed: Vec<String> = updates
            .iter()
            .filter(|u| u.new_remaining_amount <= Decimal::ZERO)
            .map(|u| u.order_id.clone())
            .collect();

        if let Err(e) = self.store.batch_write(ops).await {
            error!(trade_id = %trade.id, kind = e.kind(), error = %e, "trade batch rejected; nothing applied");
            return Err(TradeCommitError::Store(e));
        }

        info!(
            trade_id = %trade.id,
            orders = updates.len(),
            closed = orders_closed.len(),
            "trade committed with order updates"
        );

        Ok(TradeCommit {
            trade_id: trade.id,
            orders_updated: updates.iter().map(|u| u.order_id.clone()).collect(),
            orders_closed,
            committed_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
    }

    fn trade(id: &str) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            order_id: "o1".to_string(),
            buyer: "0xbuyer".to_string(),
            amount: Decimal::from(5),
            price: None,
            chain_id: 1,
            tx_hash: None,
            created_at: now(),
        }
    }

    fn upd(order_id: &str, amount: &str) -> OrderBalanceUpdate {
        OrderBalanceUpdate {
            order_id: order_id.to_string(),
            new_remaining_amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn batch_starts_with_trade_insert() {
        let ops = build_trade_batch(&trade("t1"), &[upd("o1", "5")], now()).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], WriteOp::InsertTrade(t) if t.id == "t1"));
    }

    #[test]
    fn zero_or_negative_remaining_bundles_close() {
        let ops = build_trade_batch(
            &trade("t1"),
            &[upd("o1", "0"), upd("o2", "-0.5"), upd("o3", "0.000001")],
            now(),
        )
        .unwrap();

        let statuses: Vec<Option<OrderStatus>> = ops[1..]
            .iter()
            .map(|op| match op {
                WriteOp::UpdateOrder { fields, .. } => fields.status,
                WriteOp::InsertTrade(_) => panic!("unexpected trade insert"),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![Some(OrderStatus::Closed), Some(OrderStatus::Closed), None]
        );
    }

    #[test]
    fn updates_stamp_updated_at() {
        let ops = build_trade_batch(&trade("t1"), &[upd("o1", "1")], now()).unwrap();
        match &ops[1] {
            WriteOp::UpdateOrder { fields, .. } => assert_eq!(fields.updated_at, Some(now())),
            _ => panic!("expected order update"),
        }
    }

    #[test]
    fn rejects_empty_trade_id_and_duplicate_orders() {
        assert!(matches!(
            build_trade_batch(&trade(" "), &[], now()),
            Err(TradeCommitError::Invalid(_))
        ));
        assert!(matches!(
            build_trade_batch(&trade("t1"), &[upd("o1", "1"), upd("o1", "2")], now()),
            Err(TradeCommitError::Invalid(_))
        ));
    }

    #[test]
    fn trade_without_updates_is_a_single_insert() {
        let ops = build_trade_batch(&trade("t1"), &[], now()).unwrap();
        assert_eq!(ops.len(), 1);
    }
}
