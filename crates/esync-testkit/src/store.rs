use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use esync_schemas::{MismatchAlert, OrderRecord, ScanMetrics, SystemHealth, TradeRecord};
use esync_store::{
    AlertSink, MetricsSink, OffchainStore, OrderFields, OrderFilter, StoreError, WriteOp,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: BTreeMap<String, OrderRecord>,
    trades: BTreeMap<String, TradeRecord>,
}

#[derive(Debug, Default)]
struct Faults {
    query: Option<StoreError>,
    /// Order ids whose update is rejected (single or batched).
    reject_updates: BTreeSet<String>,
    metrics: Option<StoreError>,
    health: Option<StoreError>,
    alerts: Option<StoreError>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    alerts: Vec<MismatchAlert>,
    scan_metrics: Option<ScanMetrics>,
    system_health: Option<SystemHealth>,
    update_calls: usize,
    batch_calls: usize,
    faults: Faults,
}

/// In-memory store and sinks.
///
/// `batch_write` applies ops to a copy of the tables and swaps it in only
/// when every op succeeded, so a failed batch leaves no trace.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = OrderRecord>) -> Self {
        let s = Self::new();
        for o in orders {
            s.insert_order(o);
        }
        s
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert_order(&self, order: OrderRecord) {
        self.lock().tables.orders.insert(order.id.clone(), order);
    }

    pub fn order(&self, id: &str) -> Option<OrderRecord> {
        self.lock().tables.orders.get(id).cloned()
    }

    pub fn trade(&self, id: &str) -> Option<TradeRecord> {
        self.lock().tables.trades.get(id).cloned()
    }

    pub fn alerts(&self) -> Vec<MismatchAlert> {
        self.lock().alerts.clone()
    }

    pub fn scan_metrics(&self) -> Option<ScanMetrics> {
        self.lock().scan_metrics.clone()
    }

    pub fn system_health(&self) -> Option<SystemHealth> {
        self.lock().system_health.clone()
    }

    /// Number of `update_order` calls that reached the store.
    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    pub fn batch_calls(&self) -> usize {
        self.lock().batch_calls
    }

    // --- failure injection --------------------------------------------------

    pub fn fail_queries(&self, err: StoreError) {
        self.lock().faults.query = Some(err);
    }

    pub fn reject_update_of(&self, order_id: &str) {
        self.lock().faults.reject_updates.insert(order_id.to_string());
    }

    pub fn fail_metrics(&self, err: StoreError) {
        self.lock().faults.metrics = Some(err);
    }

    pub fn fail_health(&self, err: StoreError) {
        self.lock().faults.health = Some(err);
    }

    pub fn fail_alerts(&self, err: StoreError) {
        self.lock().faults.alerts = Some(err);
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }
}

fn apply_update(
    tables: &mut Tables,
    faults: &Faults,
    id: &str,
    fields: &OrderFields,
) -> Result<(), StoreError> {
    if faults.reject_updates.contains(id) {
        return Err(StoreError::Rejected(format!("update of order {id} rejected")));
    }
    let order = tables
        .orders
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
    fields.apply_to(order);
    Ok(())
}

#[async_trait::async_trait]
impl OffchainStore for InMemoryStore {
    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StoreError> {
        let g = self.lock();
        if let Some(e) = &g.faults.query {
            return Err(e.clone());
        }
        let it = g.tables.orders.values().filter(|o| filter.matches(o)).cloned();
        Ok(match filter.limit {
            Some(n) => it.take(n).collect(),
            None => it.collect(),
        })
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>, StoreError> {
        let g = self.lock();
        if let Some(e) = &g.faults.query {
            return Err(e.clone());
        }
        Ok(g.tables.orders.get(id).cloned())
    }

    async fn update_order(&self, id: &str, fields: &OrderFields) -> Result<(), StoreError> {
        let mut g = self.lock();
        g.update_calls += 1;
        let Inner { tables, faults, .. } = &mut *g;
        apply_update(tables, faults, id, fields)
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut g = self.lock();
        g.batch_calls += 1;
        let mut next = g.tables.clone();
        for op in &ops {
            match op {
                WriteOp::InsertTrade(t) => {
                    if next.trades.contains_key(&t.id) {
                        return Err(StoreError::Rejected(format!("trade {} already exists", t.id)));
                    }
                    next.trades.insert(t.id.clone(), t.clone());
                }
                WriteOp::UpdateOrder { order_id, fields } => {
                    apply_update(&mut next, &g.faults, order_id, fields)?;
                }
            }
        }
        g.tables = next;
        Ok(())
    }

    async fn get_trade(&self, id: &str) -> Result<Option<TradeRecord>, StoreError> {
        Ok(self.lock().tables.trades.get(id).cloned())
    }
}

#[async_trait::async_trait]
impl MetricsSink for InMemoryStore {
    async fn put_scan_metrics(&self, metrics: &ScanMetrics) -> Result<(), StoreError> {
        let mut g = self.lock();
        if let Some(e) = &g.faults.metrics {
            return Err(e.clone());
        }
        g.scan_metrics = Some(metrics.clone());
        Ok(())
    }

    async fn put_system_health(&self, health: &SystemHealth) -> Result<(), StoreError> {
        let mut g = self.lock();
        if let Some(e) = &g.faults.health {
            return Err(e.clone());
        }
        g.system_health = Some(health.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl AlertSink for InMemoryStore {
    async fn write_alerts(&self, alerts: &[MismatchAlert]) -> Result<(), StoreError> {
        let mut g = self.lock();
        if let Some(e) = &g.faults.alerts {
            return Err(e.clone());
        }
        g.alerts.extend_from_slice(alerts);
        Ok(())
    }
}
