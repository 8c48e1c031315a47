//! Request and response types for the esync-daemon HTTP endpoints.
//!
//! Serialize + Deserialize so Axum can encode them and the CLI and tests
//! can decode them. No business logic lives here.

use esync_schemas::{OrderBalanceUpdate, TradeRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Scheduler lifecycle
// ---------------------------------------------------------------------------

/// Optional body of the `start` endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerResponse {
    pub scheduler: String,
    pub active: bool,
    pub interval_ms: u64,
    /// False when the call was a no-op (already running / already stopped).
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitTradeRequest {
    pub trade: TradeRecord,
    pub updates: Vec<OrderBalanceUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateAmountRequest {
    pub amount: Decimal,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Ledger amount when a validation failed on insufficient balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Decimal>,
}
