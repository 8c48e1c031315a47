use chrono::{DateTime, Utc};
use esync_schemas::{ComponentStatus, MismatchAlert, ScanMetrics};
use esync_store::PersistenceOutcome;
use serde::{Deserialize, Serialize};

/// Broadcast by the monitors and the trade path; the daemon relays these
/// over SSE.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    SchedulerStateChanged {
        scheduler: String,
        active: bool,
        interval_ms: u64,
    },
    ScanCompleted {
        metrics: ScanMetrics,
        alerts_raised: usize,
        metrics_persistence: PersistenceOutcome,
        alerts_persistence: PersistenceOutcome,
    },
    ScanFailed {
        error: String,
        ts: DateTime<Utc>,
    },
    MismatchDetected(MismatchAlert),
    HealthChecked {
        overall: ComponentStatus,
        check_duration_ms: u64,
        last_updated: DateTime<Utc>,
    },
    TradeCommitted {
        trade_id: String,
        orders_updated: usize,
        orders_closed: usize,
    },
}
