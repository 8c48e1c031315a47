//! esync-schemas
//!
//! Shared data model for the escrow sync workspace: off-chain order and trade
//! records, ledger snapshots, mismatch alerts, scan metrics and the health
//! model. Plain data only; no IO.

mod health;

pub use health::*;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest decimal scale `rust_decimal` can represent.
pub const MAX_TOKEN_DECIMALS: u32 = 28;

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Lifecycle status of an escrowed sell order as cached off-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Pending,
    Closed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Closed => "CLOSED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "PENDING" => Ok(OrderStatus::Pending),
            "CLOSED" => Ok(OrderStatus::Closed),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(anyhow!("invalid order status: {}", other)),
        }
    }

    /// Active orders are the ones a scan cycle reconciles.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::Pending)
    }

    pub const ACTIVE: [OrderStatus; 2] = [OrderStatus::Open, OrderStatus::Pending];
}

/// Off-chain cached projection of one escrow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    /// uint256 order id inside the escrow contract, decimal or `0x` hex.
    pub on_chain_id: String,
    pub token_decimals: u32,
    pub chain_id: u64,
    pub status: OrderStatus,
    /// Cached remaining amount in token units (already descaled).
    pub remaining_amount: Decimal,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// `"ledger"` once a reconciliation pass has overwritten the amount.
    pub sync_source: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(
        id: impl Into<String>,
        on_chain_id: impl Into<String>,
        token_decimals: u32,
        chain_id: u64,
        remaining_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            on_chain_id: on_chain_id.into(),
            token_decimals,
            chain_id,
            status: OrderStatus::Open,
            remaining_amount,
            last_synced_at: None,
            sync_source: None,
            updated_at: now,
        }
    }
}

/// Marker stamped into `OrderRecord::sync_source` by reconciliation writes.
pub const SYNC_SOURCE_LEDGER: &str = "ledger";

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Point-in-time read of an order's remaining amount from the escrow contract.
///
/// `raw_remaining` is the contract integer, scaled by the token's decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOrderSnapshot {
    pub chain_id: u64,
    pub on_chain_id: String,
    pub raw_remaining: u128,
    pub fetched_at: DateTime<Utc>,
}

impl LedgerOrderSnapshot {
    /// Convert the raw contract integer into token units.
    pub fn descale(&self, token_decimals: u32) -> Result<Decimal> {
        descale_raw_amount(self.raw_remaining, token_decimals)
    }
}

/// `raw / 10^decimals`, exact. Fails when the value cannot be represented.
pub fn descale_raw_amount(raw: u128, token_decimals: u32) -> Result<Decimal> {
    if token_decimals > MAX_TOKEN_DECIMALS {
        bail!(
            "token_decimals={} exceeds supported maximum {}",
            token_decimals,
            MAX_TOKEN_DECIMALS
        );
    }
    let signed = i128::try_from(raw).map_err(|_| anyhow!("raw amount {} overflows i128", raw))?;
    let value = Decimal::try_from_i128_with_scale(signed, token_decimals)
        .map_err(|e| anyhow!("raw amount {} not representable: {}", raw, e))?;
    Ok(value.normalize())
}

/// Scalar fields of the escrow contract that health probes read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractField {
    Owner,
    Fee,
    Paused,
}

impl ContractField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractField::Owner => "owner",
            ContractField::Fee => "fee",
            ContractField::Paused => "paused",
        }
    }
}

/// Decoded value of a [`ContractField`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContractValue {
    Address(String),
    Uint(u128),
    Bool(bool),
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// A filled trade against an escrow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub order_id: String,
    pub buyer: String,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub chain_id: u64,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New remaining amount for one order touched by a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBalanceUpdate {
    pub order_id: String,
    pub new_remaining_amount: Decimal,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Mismatch severity. Ordering follows magnitude: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(anyhow!("invalid severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchAlert {
    pub id: Uuid,
    pub order_id: String,
    pub on_chain_id: String,
    pub store_amount: Decimal,
    pub ledger_amount: Decimal,
    pub divergence: Decimal,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Resolution happens outside this system.
    #[serde(default)]
    pub resolved: bool,
}

// ---------------------------------------------------------------------------
// Scan metrics
// ---------------------------------------------------------------------------

/// Aggregate outcome of one scan cycle over all active orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub total_orders: u64,
    pub synced_orders: u64,
    pub failed_orders: u64,
    pub total_mismatches: u64,
    pub average_divergence: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl ScanMetrics {
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            total_orders: 0,
            synced_orders: 0,
            failed_orders: 0,
            total_mismatches: 0,
            average_divergence: Decimal::ZERO,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn descale_six_decimals() {
        let v = descale_raw_amount(99_500_000, 6).unwrap();
        assert_eq!(v, Decimal::from_str("99.5").unwrap());
    }

    #[test]
    fn descale_zero_decimals_is_identity() {
        assert_eq!(descale_raw_amount(42, 0).unwrap(), Decimal::from(42));
    }

    #[test]
    fn descale_rejects_oversized_scale() {
        assert!(descale_raw_amount(1, 29).is_err());
    }

    #[test]
    fn descale_rejects_unrepresentable_raw() {
        assert!(descale_raw_amount(u128::MAX, 18).is_err());
    }

    #[test]
    fn order_status_roundtrip_and_activity() {
        for s in [
            OrderStatus::Open,
            OrderStatus::Pending,
            OrderStatus::Closed,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::Open.is_active());
        assert!(OrderStatus::Pending.is_active());
        assert!(!OrderStatus::Closed.is_active());
        assert!(OrderStatus::parse("open").is_err());
    }

    #[test]
    fn severity_orders_by_magnitude() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn contract_fields_key_ordered_maps_per_chain() {
        use std::collections::BTreeMap;

        let mut m = BTreeMap::new();
        m.insert((137u64, ContractField::Paused), ContractValue::Bool(false));
        m.insert((137u64, ContractField::Owner), ContractValue::Address("0x01".into()));
        m.insert((1u64, ContractField::Fee), ContractValue::Uint(30));

        let keys: Vec<_> = m.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                (1, ContractField::Fee),
                (137, ContractField::Owner),
                (137, ContractField::Paused),
            ]
        );
    }

    #[test]
    fn alert_resolved_defaults_false_when_absent() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "order_id": "o1",
            "on_chain_id": "7",
            "store_amount": "100",
            "ledger_amount": "99.5",
            "divergence": "0.5",
            "severity": "high",
            "timestamp": "2026-01-01T00:00:00Z"
        });
        let alert: MismatchAlert = serde_json::from_value(json).unwrap();
        assert!(!alert.resolved);
        assert_eq!(alert.severity, Severity::High);
    }
}
