//! Shared runtime state for esync-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The monitoring
//! services own all scheduling; this module only relays their events onto
//! the SSE bus.

use std::sync::Arc;
use std::time::Duration;

use esync_runtime::{MonitorEvent, MonitoringServices};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

// ---------------------------------------------------------------------------
// BusMsg (SSE event bus payload)
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Monitor { event: MonitorEvent },
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub services: Arc<MonitoringServices>,
    /// Hash of the effective config the daemon booted with.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(services: Arc<MonitoringServices>, config_hash: Option<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "esync-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            services,
            config_hash,
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Relay monitor events onto the SSE bus until the services are dropped.
///
/// A lagging relay drops the missed events and reports how many on the bus.
pub fn spawn_event_relay(
    mut events: broadcast::Receiver<MonitorEvent>,
    bus: broadcast::Sender<BusMsg>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let MonitorEvent::ScanFailed { error, .. } = &event {
                        let _ = bus.send(BusMsg::LogLine {
                            level: "ERROR".to_string(),
                            msg: format!("scan failed: {error}"),
                        });
                    }
                    let _ = bus.send(BusMsg::Monitor { event });
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "event relay lagged");
                    let _ = bus.send(BusMsg::LogLine {
                        level: "WARN".to_string(),
                        msg: format!("{n} monitor events dropped"),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
