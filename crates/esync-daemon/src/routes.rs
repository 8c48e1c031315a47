//! Axum router and all HTTP handlers for esync-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are thin: every operation delegates to
//! [`esync_runtime::MonitoringServices`].

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use esync_runtime::{MonitorEvent, MonitoringStatus};
use esync_schemas::{ScanMetrics, SystemHealth, UptimeStats};
use esync_trade::{AmountCheck, TradeCommit};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        CommitTradeRequest, HealthResponse, SchedulerResponse, StartRequest, ValidateAmountRequest,
    },
    error::AppError,
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/monitoring/start", post(monitoring_start))
        .route("/v1/monitoring/stop", post(monitoring_stop))
        .route("/v1/monitoring/scan", post(monitoring_scan))
        .route("/v1/monitoring/status", get(monitoring_status))
        .route("/v1/monitoring/history", get(monitoring_history))
        .route("/v1/system-health", get(system_health_current))
        .route("/v1/system-health/start", post(system_health_start))
        .route("/v1/system-health/stop", post(system_health_stop))
        .route("/v1/system-health/check", post(system_health_check))
        .route("/v1/system-health/history", get(system_health_history))
        .route("/v1/system-health/uptime", get(system_health_uptime))
        .route("/v1/trades", post(commit_trade))
        .route("/v1/orders/:id/validate", post(validate_order_amount))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Reconciliation monitoring
// ---------------------------------------------------------------------------

/// Starts periodic scanning; the response is sent after the first scan.
pub(crate) async fn monitoring_start(
    State(st): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Json<SchedulerResponse> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let changed = st.services.start_monitoring(req.interval_ms).await;
    let rec = st.services.reconciliation();
    info!(changed, interval_ms = rec.interval_ms(), "monitoring/start");
    Json(SchedulerResponse {
        scheduler: "reconciliation".to_string(),
        active: rec.is_active(),
        interval_ms: rec.interval_ms(),
        changed,
    })
}

pub(crate) async fn monitoring_stop(State(st): State<Arc<AppState>>) -> Json<SchedulerResponse> {
    let changed = st.services.stop_monitoring();
    let rec = st.services.reconciliation();
    info!(changed, "monitoring/stop");
    Json(SchedulerResponse {
        scheduler: "reconciliation".to_string(),
        active: rec.is_active(),
        interval_ms: rec.interval_ms(),
        changed,
    })
}

pub(crate) async fn monitoring_scan(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ScanMetrics>, AppError> {
    let metrics = st.services.trigger_manual_scan().await?;
    Ok(Json(metrics))
}

pub(crate) async fn monitoring_status(State(st): State<Arc<AppState>>) -> Json<MonitoringStatus> {
    Json(st.services.get_monitoring_status())
}

pub(crate) async fn monitoring_history(State(st): State<Arc<AppState>>) -> Json<Vec<ScanMetrics>> {
    Json(st.services.get_scan_history())
}

// ---------------------------------------------------------------------------
// System health
// ---------------------------------------------------------------------------

pub(crate) async fn system_health_start(
    State(st): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Json<SchedulerResponse> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let health = st.services.health();
    let changed = health.start(req.interval_ms).await;
    info!(changed, interval_ms = health.interval_ms(), "system-health/start");
    Json(SchedulerResponse {
        scheduler: "health".to_string(),
        active: health.is_active(),
        interval_ms: health.interval_ms(),
        changed,
    })
}

pub(crate) async fn system_health_stop(State(st): State<Arc<AppState>>) -> Json<SchedulerResponse> {
    let health = st.services.health();
    let changed = health.stop();
    info!(changed, "system-health/stop");
    Json(SchedulerResponse {
        scheduler: "health".to_string(),
        active: health.is_active(),
        interval_ms: health.interval_ms(),
        changed,
    })
}

pub(crate) async fn system_health_check(State(st): State<Arc<AppState>>) -> Json<SystemHealth> {
    Json(st.services.health().check_now().await)
}

/// 404 until the first health cycle has completed.
pub(crate) async fn system_health_current(
    State(st): State<Arc<AppState>>,
) -> Result<Json<SystemHealth>, AppError> {
    st.services
        .get_current_health()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no health check has completed yet".to_string()))
}

pub(crate) async fn system_health_history(
    State(st): State<Arc<AppState>>,
) -> Json<Vec<SystemHealth>> {
    Json(st.services.get_health_history())
}

pub(crate) async fn system_health_uptime(State(st): State<Arc<AppState>>) -> Json<UptimeStats> {
    Json(st.services.get_uptime_stats())
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

pub(crate) async fn commit_trade(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CommitTradeRequest>,
) -> Result<(StatusCode, Json<TradeCommit>), AppError> {
    let commit = st
        .services
        .commit_trade_with_order_updates(req.trade, &req.updates)
        .await?;
    Ok((StatusCode::CREATED, Json(commit)))
}

pub(crate) async fn validate_order_amount(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<ValidateAmountRequest>,
) -> Result<Json<AmountCheck>, AppError> {
    let check = st
        .services
        .validate_trade_amount(&order_id, req.amount)
        .await?;
    Ok(Json(check))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

/// SSE event name for a bus message.
pub fn event_name(msg: &BusMsg) -> &'static str {
    match msg {
        BusMsg::Heartbeat { .. } => "heartbeat",
        BusMsg::LogLine { .. } => "log",
        BusMsg::Monitor { event } => match event {
            MonitorEvent::SchedulerStateChanged { .. } => "scheduler",
            MonitorEvent::ScanCompleted { .. } | MonitorEvent::ScanFailed { .. } => "scan",
            MonitorEvent::MismatchDetected(_) => "mismatch",
            MonitorEvent::HealthChecked { .. } => "health",
            MonitorEvent::TradeCommitted { .. } => "trade",
        },
    }
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name(&m)).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
