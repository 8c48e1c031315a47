use chrono::{DateTime, Utc};
use esync_schemas::{OrderRecord, OrderStatus, TradeRecord};
use rust_decimal::Decimal;

use crate::StoreError;

/// Filter for [`OffchainStore::query_orders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Empty = any status.
    pub statuses: Vec<OrderStatus>,
    pub chain_id: Option<u64>,
    pub limit: Option<usize>,
}

impl OrderFilter {
    /// OPEN or PENDING orders on any chain.
    pub fn active() -> Self {
        Self {
            statuses: OrderStatus::ACTIVE.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, order: &OrderRecord) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&order.status);
        let chain_ok = self.chain_id.map_or(true, |c| c == order.chain_id);
        status_ok && chain_ok
    }
}

/// Partial update of an order document. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFields {
    pub remaining_amount: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_source: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderFields {
    pub fn is_empty(&self) -> bool {
        self == &OrderFields::default()
    }

    /// Apply the set fields onto an in-memory record.
    pub fn apply_to(&self, order: &mut OrderRecord) {
        if let Some(v) = self.remaining_amount {
            order.remaining_amount = v;
        }
        if let Some(v) = self.status {
            order.status = v;
        }
        if let Some(v) = self.last_synced_at {
            order.last_synced_at = Some(v);
        }
        if let Some(v) = &self.sync_source {
            order.sync_source = Some(v.clone());
        }
        if let Some(v) = self.updated_at {
            order.updated_at = v;
        }
    }
}

/// One member of an atomic multi-document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    InsertTrade(TradeRecord),
    UpdateOrder { order_id: String, fields: OrderFields },
}

impl WriteOp {
    pub fn label(&self) -> String {
        match self {
            WriteOp::InsertTrade(t) => format!("insert_trade:{}", t.id),
            WriteOp::UpdateOrder { order_id, .. } => format!("update_order:{}", order_id),
        }
    }
}

/// Persisted order/trade records.
#[async_trait::async_trait]
pub trait OffchainStore: Send + Sync {
    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StoreError>;

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>, StoreError>;

    /// Single-document update. Fails with `NotFound` if the order is absent.
    async fn update_order(&self, id: &str, fields: &OrderFields) -> Result<(), StoreError>;

    /// All-or-nothing write. On `Err` none of `ops` is visible.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    async fn get_trade(&self, id: &str) -> Result<Option<TradeRecord>, StoreError>;
}
