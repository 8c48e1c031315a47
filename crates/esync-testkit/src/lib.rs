//! esync-testkit
//!
//! Deterministic in-process collaborators for scenario tests:
//!
//! - [`InMemoryStore`]: `OffchainStore` + `MetricsSink` + `AlertSink` with
//!   all-or-nothing batch writes and per-operation failure injection.
//! - [`ScriptedLedger`]: `LedgerReader` returning scripted raw amounts,
//!   contract fields and block numbers, with optional latency.
//! - [`FixedClock`]: settable wall clock.
//! - [`StaticProbe`]: health probe with a scripted verdict.
//!
//! No network, no database.

mod clock;
mod ledger;
mod probe;
mod store;

pub use clock::FixedClock;
pub use ledger::ScriptedLedger;
pub use probe::StaticProbe;
pub use store::InMemoryStore;

use chrono::{DateTime, TimeZone, Utc};
use esync_schemas::{OrderRecord, OrderStatus, TradeRecord};
use rust_decimal::Decimal;

/// Fixed instant used as "now" across scenarios.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// OPEN order on chain 1 with the given cached amount.
pub fn order(id: &str, on_chain_id: &str, token_decimals: u32, remaining: Decimal) -> OrderRecord {
    OrderRecord::new(id, on_chain_id, token_decimals, 1, remaining, t0())
}

pub fn order_with_status(id: &str, remaining: Decimal, status: OrderStatus) -> OrderRecord {
    let mut o = order(id, id, 6, remaining);
    o.status = status;
    o
}

pub fn trade(id: &str, order_id: &str, amount: Decimal) -> TradeRecord {
    TradeRecord {
        id: id.to_string(),
        order_id: order_id.to_string(),
        buyer: "0xb0b".to_string(),
        amount,
        price: None,
        chain_id: 1,
        tx_hash: None,
        created_at: t0(),
    }
}

/// Parse a decimal literal. Test helper; panics on bad input.
pub fn dec(s: &str) -> Decimal {
    match s.parse() {
        Ok(d) => d,
        Err(e) => panic!("bad decimal literal {s:?}: {e}"),
    }
}
