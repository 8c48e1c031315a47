use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use esync_schemas::{ScanMetrics, SystemHealth};
use serde::Serialize;

mod client;

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "esync")]
#[command(about = "Escrow sync monitoring CLI", long_about = None)]
struct Cli {
    /// Base URL of a running esync-daemon
    #[arg(
        long,
        global = true,
        env = "ESYNC_DAEMON_URL",
        default_value = "http://127.0.0.1:8899"
    )]
    daemon_url: String,

    /// Print raw JSON instead of key=value lines
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Request timeout in seconds (scans can take a while)
    #[arg(long, global = true, default_value_t = 120)]
    timeout_secs: u64,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconciliation monitoring (via daemon)
    Monitor {
        #[command(subcommand)]
        cmd: MonitorCmd,
    },

    /// System health (via daemon)
    Health {
        #[command(subcommand)]
        cmd: HealthCmd,
    },

    /// Database commands (local, uses ESYNC_DATABASE_URL)
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base first)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MonitorCmd {
    /// Start periodic scanning; returns after the first scan
    Start {
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    Stop,
    /// Run one scan now
    Scan,
    Status,
    /// Retained scan metrics, oldest first
    History,
}

#[derive(Subcommand)]
enum HealthCmd {
    /// Latest completed health cycle
    Current,
    /// Run one health cycle now
    Check,
    History,
    Uptime,
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply embedded SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Monitor { cmd } => {
            let c = DaemonClient::new(&cli.daemon_url, Duration::from_secs(cli.timeout_secs))?;
            match cmd {
                MonitorCmd::Start { interval_ms } => {
                    let r = c.monitoring_start(interval_ms).await?;
                    emit(cli.json, &r, || {
                        println!(
                            "active={} interval_ms={} changed={}",
                            r.active, r.interval_ms, r.changed
                        );
                    })?;
                }
                MonitorCmd::Stop => {
                    let r = c.monitoring_stop().await?;
                    emit(cli.json, &r, || {
                        println!("active={} changed={}", r.active, r.changed);
                    })?;
                }
                MonitorCmd::Scan => {
                    let m = c.monitoring_scan().await?;
                    emit(cli.json, &m, || print_metrics(&m))?;
                }
                MonitorCmd::Status => {
                    let s = c.monitoring_status().await?;
                    emit(cli.json, &s, || {
                        println!(
                            "active={} interval_ms={} scans_recorded={}",
                            s.active, s.interval_ms, s.scans_recorded
                        );
                        match &s.last_scan {
                            Some(m) => print_metrics(m),
                            None => println!("last_scan=none"),
                        }
                    })?;
                }
                MonitorCmd::History => {
                    let ms = c.monitoring_history().await?;
                    emit(cli.json, &ms, || {
                        println!("entries={}", ms.len());
                        ms.iter().for_each(print_metrics);
                    })?;
                }
            }
        }

        Commands::Health { cmd } => {
            let c = DaemonClient::new(&cli.daemon_url, Duration::from_secs(cli.timeout_secs))?;
            match cmd {
                HealthCmd::Current => {
                    let h = c.health_current().await?;
                    emit(cli.json, &h, || print_health(&h))?;
                }
                HealthCmd::Check => {
                    let h = c.health_check().await?;
                    emit(cli.json, &h, || print_health(&h))?;
                }
                HealthCmd::History => {
                    let hs = c.health_history().await?;
                    emit(cli.json, &hs, || {
                        println!("entries={}", hs.len());
                        for h in &hs {
                            println!(
                                "last_updated={} overall={} check_duration_ms={}",
                                h.last_updated.to_rfc3339(),
                                h.overall.as_str(),
                                h.check_duration_ms
                            );
                        }
                    })?;
                }
                HealthCmd::Uptime => {
                    let u = c.health_uptime().await?;
                    emit(cli.json, &u, || {
                        println!(
                            "uptime_percentage={:.2} total_checks={} successful_checks={}",
                            u.uptime_percentage, u.total_checks, u.successful_checks
                        );
                    })?;
                }
            }
        }

        Commands::Db { cmd } => {
            let pool = esync_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = esync_db::status(&pool).await?;
                    emit(cli.json, &s, || {
                        println!(
                            "db_ok={} has_orders_table={} active_orders={}",
                            s.ok, s.has_orders_table, s.active_orders
                        );
                    })?;
                }
                DbCmd::Migrate => {
                    esync_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let loaded = esync_config::load_layered_yaml(paths.as_slice())?;
            println!("config_hash={}", loaded.config_hash);
            for key in loaded.unused_keys() {
                eprintln!("warning: unused config key {key}");
            }
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

fn print_metrics(m: &ScanMetrics) {
    println!(
        "total_orders={} synced_orders={} failed_orders={} total_mismatches={} average_divergence={} timestamp={}",
        m.total_orders,
        m.synced_orders,
        m.failed_orders,
        m.total_mismatches,
        m.average_divergence,
        m.timestamp.to_rfc3339()
    );
}

fn print_health(h: &SystemHealth) {
    println!(
        "overall={} check_duration_ms={} average_response_time_ms={:.1}",
        h.overall.as_str(),
        h.check_duration_ms,
        h.performance.average_response_time_ms
    );
    for c in &h.components {
        let rt = c
            .response_time_ms
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        let line = format!(
            "component={} status={} response_time_ms={}",
            c.component,
            c.status.as_str(),
            rt
        );
        match &c.error {
            Some(e) => println!("{line} error={e:?}"),
            None => println!("{line}"),
        }
    }
}
