//! Scenario: monitor lifecycle through the composition root.
//!
//! # Invariants under test
//!
//! 1. `start_monitoring` runs the first scan before returning.
//! 2. Two starts in quick succession leave exactly one active timer.
//! 3. `stop_monitoring` leaves `active == false` and no further scans run.
//! 4. Manual scans work while stopped and are recorded in status.
//! 5. Reconciliation and health schedulers are independent.
//! 6. Two service instances share no state.

use std::sync::Arc;
use std::time::Duration;

use esync_health::{FixedMemory, HealthProbe};
use esync_runtime::{Collaborators, MonitorEvent, MonitoringServices, RuntimeSettings};
use esync_schemas::ComponentStatus;
use esync_testkit::{dec, order, FixedClock, InMemoryStore, ScriptedLedger, StaticProbe};

struct Rig {
    store: Arc<InMemoryStore>,
    ledger: Arc<ScriptedLedger>,
    services: MonitoringServices,
}

fn rig(interval_ms: u64) -> Rig {
    let store = Arc::new(InMemoryStore::with_orders([order("o1", "7", 6, dec("100"))]));
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_remaining(1, "7", 100_000_000);

    let settings = RuntimeSettings {
        reconcile_interval: Duration::from_millis(interval_ms),
        health_interval: Duration::from_millis(interval_ms),
        ..RuntimeSettings::default()
    };
    let collab = Collaborators {
        ledger: Arc::clone(&ledger) as _,
        store: Arc::clone(&store) as _,
        metrics_sink: Arc::clone(&store) as _,
        alert_sink: Arc::clone(&store) as _,
        clock: Arc::new(FixedClock::default()),
        memory: Arc::new(FixedMemory(Some(64 * 1024 * 1024))),
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![Arc::new(StaticProbe::new("api", ComponentStatus::Healthy))];
    let services = MonitoringServices::with_probes(collab, &settings, probes);
    Rig { store, ledger, services }
}

#[tokio::test(start_paused = true)]
async fn start_runs_first_scan_immediately() {
    let r = rig(60_000);

    assert!(r.services.start_monitoring(None).await);

    let status = r.services.get_monitoring_status();
    assert!(status.active);
    assert_eq!(status.interval_ms, 60_000);
    assert_eq!(status.scans_recorded, 1);
    assert_eq!(status.last_scan.map(|m| m.total_orders), Some(1));
    assert!(r.store.scan_metrics().is_some());
    r.services.shutdown();
}

#[tokio::test(start_paused = true)]
async fn double_start_keeps_one_timer_and_stop_deactivates() {
    let r = rig(1_000);

    assert!(r.services.start_monitoring(None).await);
    assert!(!r.services.start_monitoring(Some(10)).await);
    assert_eq!(r.services.get_monitoring_status().interval_ms, 1_000);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    // Initial scan plus ticks at 1s, 2s and 3s.
    assert_eq!(r.ledger.order_reads(), 4);

    assert!(r.services.stop_monitoring());
    assert!(!r.services.get_monitoring_status().active);
    assert!(!r.services.stop_monitoring());

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(r.ledger.order_reads(), 4);
}

#[tokio::test(start_paused = true)]
async fn manual_scan_works_while_stopped() {
    let r = rig(1_000);

    let m = r.services.trigger_manual_scan().await.unwrap();

    assert_eq!(m.total_orders, 1);
    let status = r.services.get_monitoring_status();
    assert!(!status.active);
    assert_eq!(status.scans_recorded, 1);
}

#[tokio::test(start_paused = true)]
async fn health_scheduler_runs_independently() {
    let r = rig(1_000);

    assert!(r.services.health().start(None).await);
    assert!(!r.services.reconciliation().is_active());
    assert_eq!(r.services.get_health_history().len(), 1);
    assert_eq!(
        r.services.get_current_health().map(|h| h.overall),
        Some(ComponentStatus::Healthy)
    );

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(r.services.get_health_history().len(), 3);
    assert_eq!(r.services.get_uptime_stats().successful_checks, 3);
    assert_eq!(r.ledger.order_reads(), 0);

    assert!(r.services.health().stop());
    assert!(!r.services.health().is_active());
}

#[tokio::test(start_paused = true)]
async fn events_announce_state_and_scans() {
    let r = rig(1_000);
    let mut rx = r.services.subscribe();

    r.services.start_monitoring(None).await;
    r.services.stop_monitoring();

    let mut saw_scan = false;
    let mut states = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        match ev {
            MonitorEvent::ScanCompleted { metrics, .. } => {
                saw_scan = true;
                assert_eq!(metrics.total_orders, 1);
            }
            MonitorEvent::SchedulerStateChanged { active, .. } => states.push(active),
            _ => {}
        }
    }
    assert!(saw_scan);
    assert_eq!(states, vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn instances_are_isolated() {
    let a = rig(1_000);
    let b = rig(1_000);

    a.services.start_monitoring(None).await;

    assert!(a.services.get_monitoring_status().active);
    assert!(!b.services.get_monitoring_status().active);
    assert_eq!(b.ledger.order_reads(), 0);
    a.services.shutdown();
}
