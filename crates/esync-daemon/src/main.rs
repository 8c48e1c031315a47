//! esync-daemon entry point.
//!
//! Thin: loads config and secrets, connects the store and ledger, builds the
//! monitoring services, wires middleware and serves HTTP. Route handlers live
//! in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use esync_config::{load_layered_yaml, paths_from_env, resolve_secrets, EscrowSyncConfig};
use esync_daemon::{routes, state};
use esync_db::PgStore;
use esync_health::ProcSelfStatus;
use esync_ledger::RpcLedgerReader;
use esync_runtime::{Collaborators, MonitoringServices, RuntimeSettings};
use esync_store::{Clock, SystemClock};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = paths_from_env();
    let loaded = load_layered_yaml(paths.as_slice()).context("load config")?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");
    for key in loaded.unused_keys() {
        warn!(key = %key, "config key not read by any section");
    }
    let cfg: EscrowSyncConfig = loaded.typed()?;
    let secrets = resolve_secrets(&cfg)?;

    let db_url = secrets.database_url.clone().with_context(|| {
        format!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            cfg.database.url_env
        )
    })?;
    let pool = esync_db::connect(&db_url, cfg.database.max_connections).await?;
    esync_db::migrate(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = Arc::new(RpcLedgerReader::from_config(&cfg, &secrets, Arc::clone(&clock))?);
    info!(chains = ?ledger.chain_ids(), "ledger endpoints configured");

    let settings = RuntimeSettings::from_config(&cfg)?;
    let services = Arc::new(MonitoringServices::new(
        Collaborators {
            ledger,
            store: Arc::clone(&store) as _,
            metrics_sink: Arc::clone(&store) as _,
            alert_sink: store,
            clock,
            memory: Arc::new(ProcSelfStatus),
        },
        &settings,
    ));

    let shared = Arc::new(state::AppState::new(
        Arc::clone(&services),
        Some(loaded.config_hash.clone()),
    ));
    state::spawn_heartbeat(
        shared.bus.clone(),
        Duration::from_secs(cfg.daemon.heartbeat_secs.max(1)),
    );
    state::spawn_event_relay(services.subscribe(), shared.bus.clone());

    if cfg.autostart.reconciliation {
        services.start_monitoring(None).await;
    }
    if cfg.autostart.health {
        services.health().start(None).await;
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(a) => a,
        None => cfg
            .daemon
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid daemon.bind '{}'", cfg.daemon.bind))?,
    };
    info!("esync-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    services.shutdown();
    info!("esync-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("ESYNC_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
