use async_trait::async_trait;
use esync_schemas::{
    MismatchAlert, OrderRecord, OrderStatus, ScanMetrics, SystemHealth, TradeRecord,
};
use esync_store::{
    AlertSink, MetricsSink, OffchainStore, OrderFields, OrderFilter, StoreError, WriteOp,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use tracing::{debug, warn};

use crate::map_sqlx;

const ORDER_COLUMNS: &str = "id, on_chain_id, token_decimals, chain_id, status, remaining_amount, \
                             last_synced_at, sync_source, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert or replace an order row. Used by seeding and operator tooling.
    pub async fn upsert_order(&self, o: &OrderRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into orders (
              id, on_chain_id, token_decimals, chain_id, status, remaining_amount,
              last_synced_at, sync_source, updated_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (id) do update set
              on_chain_id = excluded.on_chain_id,
              token_decimals = excluded.token_decimals,
              chain_id = excluded.chain_id,
              status = excluded.status,
              remaining_amount = excluded.remaining_amount,
              last_synced_at = excluded.last_synced_at,
              sync_source = excluded.sync_source,
              updated_at = excluded.updated_at
            "#,
        )
        .bind(&o.id)
        .bind(&o.on_chain_id)
        .bind(
            i32::try_from(o.token_decimals)
                .map_err(|_| StoreError::Rejected("token_decimals out of range".to_string()))?,
        )
        .bind(to_i64(o.chain_id)?)
        .bind(o.status.as_str())
        .bind(o.remaining_amount)
        .bind(o.last_synced_at)
        .bind(&o.sync_source)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    pub async fn latest_scan_metrics(&self) -> Result<Option<ScanMetrics>, StoreError> {
        let row = sqlx::query(
            r#"
            select total_orders, synced_orders, failed_orders, total_mismatches,
                   average_divergence, ts_utc
            from scan_metrics where singleton
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|r| -> Result<ScanMetrics, StoreError> {
            Ok(ScanMetrics {
                total_orders: to_u64(r.try_get("total_orders").map_err(map_sqlx)?)?,
                synced_orders: to_u64(r.try_get("synced_orders").map_err(map_sqlx)?)?,
                failed_orders: to_u64(r.try_get("failed_orders").map_err(map_sqlx)?)?,
                total_mismatches: to_u64(r.try_get("total_mismatches").map_err(map_sqlx)?)?,
                average_divergence: r.try_get("average_divergence").map_err(map_sqlx)?,
                timestamp: r.try_get("ts_utc").map_err(map_sqlx)?,
            })
        })
        .transpose()
    }
}

fn to_i64(v: u64) -> Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::Rejected(format!("value {v} exceeds bigint")))
}

fn to_u64(v: i64) -> Result<u64, StoreError> {
    u64::try_from(v).map_err(|_| StoreError::Other(format!("negative counter {v} in store")))
}

fn order_from_row(r: &PgRow) -> Result<OrderRecord, StoreError> {
    let status: String = r.try_get("status").map_err(map_sqlx)?;
    let decimals: i32 = r.try_get("token_decimals").map_err(map_sqlx)?;
    let chain_id: i64 = r.try_get("chain_id").map_err(map_sqlx)?;

    Ok(OrderRecord {
        id: r.try_get("id").map_err(map_sqlx)?,
        on_chain_id: r.try_get("on_chain_id").map_err(map_sqlx)?,
        token_decimals: u32::try_from(decimals)
            .map_err(|_| StoreError::Other(format!("negative token_decimals {decimals}")))?,
        chain_id: to_u64(chain_id)?,
        status: OrderStatus::parse(&status).map_err(|e| StoreError::Other(e.to_string()))?,
        remaining_amount: r.try_get("remaining_amount").map_err(map_sqlx)?,
        last_synced_at: r.try_get("last_synced_at").map_err(map_sqlx)?,
        sync_source: r.try_get("sync_source").map_err(map_sqlx)?,
        updated_at: r.try_get("updated_at").map_err(map_sqlx)?,
    })
}

fn trade_from_row(r: &PgRow) -> Result<TradeRecord, StoreError> {
    let chain_id: i64 = r.try_get("chain_id").map_err(map_sqlx)?;
    Ok(TradeRecord {
        id: r.try_get("id").map_err(map_sqlx)?,
        order_id: r.try_get("order_id").map_err(map_sqlx)?,
        buyer: r.try_get("buyer").map_err(map_sqlx)?,
        amount: r.try_get("amount").map_err(map_sqlx)?,
        price: r.try_get::<Option<Decimal>, _>("price").map_err(map_sqlx)?,
        chain_id: to_u64(chain_id)?,
        tx_hash: r.try_get("tx_hash").map_err(map_sqlx)?,
        created_at: r.try_get("created_at").map_err(map_sqlx)?,
    })
}

/// Partial update; unset fields keep their stored value. Returns rows affected.
async fn update_order_on<'e, E: PgExecutor<'e>>(
    ex: E,
    id: &str,
    fields: &OrderFields,
) -> Result<u64, StoreError> {
    let res = sqlx::query(
        r#"
        update orders set
          remaining_amount = coalesce($2, remaining_amount),
          status = coalesce($3, status),
          last_synced_at = coalesce($4, last_synced_at),
          sync_source = coalesce($5, sync_source),
          updated_at = coalesce($6, updated_at)
        where id = $1
        "#,
    )
    .bind(id)
    .bind(fields.remaining_amount)
    .bind(fields.status.map(|s| s.as_str()))
    .bind(fields.last_synced_at)
    .bind(fields.sync_source.as_deref())
    .bind(fields.updated_at)
    .execute(ex)
    .await
    .map_err(map_sqlx)?;
    Ok(res.rows_affected())
}

async fn insert_trade_on<'e, E: PgExecutor<'e>>(ex: E, t: &TradeRecord) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        insert into trades (id, order_id, buyer, amount, price, chain_id, tx_hash, created_at)
        values ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&t.id)
    .bind(&t.order_id)
    .bind(&t.buyer)
    .bind(t.amount)
    .bind(t.price)
    .bind(to_i64(t.chain_id)?)
    .bind(&t.tx_hash)
    .bind(t.created_at)
    .execute(ex)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

#[async_trait]
impl OffchainStore for PgStore {
    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StoreError> {
        let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
        let chain_id = filter.chain_id.map(to_i64).transpose()?;
        let limit = filter
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        // LIMIT NULL is LIMIT ALL.
        let sql = format!(
            "select {ORDER_COLUMNS} from orders \
             where (cardinality($1::text[]) = 0 or status = any($1)) \
               and ($2::bigint is null or chain_id = $2) \
             order by id \
             limit $3"
        );
        let rows = sqlx::query(&sql)
            .bind(&statuses)
            .bind(chain_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(order_from_row).collect()
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>, StoreError> {
        let sql = format!("select {ORDER_COLUMNS} from orders where id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn update_order(&self, id: &str, fields: &OrderFields) -> Result<(), StoreError> {
        if update_order_on(&self.pool, id, fields).await? == 0 {
            return Err(StoreError::NotFound(format!("order {id}")));
        }
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        for op in &ops {
            let applied = match op {
                WriteOp::InsertTrade(t) => insert_trade_on(&mut *tx, t).await,
                WriteOp::UpdateOrder { order_id, fields } => {
                    match update_order_on(&mut *tx, order_id, fields).await {
                        Ok(0) => Err(StoreError::NotFound(format!("order {order_id}"))),
                        Ok(_) => Ok(()),
                        Err(e) => Err(e),
                    }
                }
            };
            if let Err(e) = applied {
                // Dropping `tx` rolls back everything written so far.
                warn!(op = %op.label(), kind = e.kind(), error = %e, "batch rolled back");
                return Err(e);
            }
        }

        tx.commit().await.map_err(map_sqlx)?;
        debug!(ops = ops.len(), "batch committed");
        Ok(())
    }

    async fn get_trade(&self, id: &str) -> Result<Option<TradeRecord>, StoreError> {
        let row = sqlx::query(
            "select id, order_id, buyer, amount, price, chain_id, tx_hash, created_at \
             from trades where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(trade_from_row).transpose()
    }
}

#[async_trait]
impl MetricsSink for PgStore {
    async fn put_scan_metrics(&self, m: &ScanMetrics) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into scan_metrics (
              singleton, total_orders, synced_orders, failed_orders, total_mismatches,
              average_divergence, ts_utc
            ) values (true, $1, $2, $3, $4, $5, $6)
            on conflict (singleton) do update set
              total_orders = excluded.total_orders,
              synced_orders = excluded.synced_orders,
              failed_orders = excluded.failed_orders,
              total_mismatches = excluded.total_mismatches,
              average_divergence = excluded.average_divergence,
              ts_utc = excluded.ts_utc
            "#,
        )
        .bind(to_i64(m.total_orders)?)
        .bind(to_i64(m.synced_orders)?)
        .bind(to_i64(m.failed_orders)?)
        .bind(to_i64(m.total_mismatches)?)
        .bind(m.average_divergence)
        .bind(m.timestamp)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn put_system_health(&self, h: &SystemHealth) -> Result<(), StoreError> {
        let snapshot = serde_json::to_value(h).map_err(|e| StoreError::Other(e.to_string()))?;
        sqlx::query(
            r#"
            insert into health_snapshots (singleton, overall, snapshot, last_updated)
            values (true, $1, $2, $3)
            on conflict (singleton) do update set
              overall = excluded.overall,
              snapshot = excluded.snapshot,
              last_updated = excluded.last_updated
            "#,
        )
        .bind(h.overall.as_str())
        .bind(snapshot)
        .bind(h.last_updated)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl AlertSink for PgStore {
    async fn write_alerts(&self, alerts: &[MismatchAlert]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for a in alerts {
            sqlx::query(
                r#"
                insert into mismatch_alerts (
                  id, order_id, on_chain_id, store_amount, ledger_amount, divergence,
                  severity, ts_utc, resolved
                ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(a.id)
            .bind(&a.order_id)
            .bind(&a.on_chain_id)
            .bind(a.store_amount)
            .bind(a.ledger_amount)
            .bind(a.divergence)
            .bind(a.severity.as_str())
            .bind(a.timestamp)
            .bind(a.resolved)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }
}
