//! Scenario: system health verdict over a probe battery.
//!
//! # Invariants under test
//!
//! 1. All healthy => healthy; one warning => warning; one critical =>
//!    critical, whatever the others report.
//! 2. A probe error or a probe exceeding its deadline is critical for that
//!    component and the cycle still completes.
//! 3. Every cycle is persisted (overwrite) and appended to bounded history.
//! 4. Uptime counts non-critical cycles.

use std::sync::Arc;
use std::time::Duration;

use esync_health::{HealthAggregator, HealthProbe, HealthSettings, COMPONENT_ORDER};
use esync_schemas::ComponentStatus;
use esync_store::StoreError;
use esync_testkit::{FixedClock, InMemoryStore, StaticProbe};

use ComponentStatus::{Critical, Healthy, Warning};

fn battery(statuses: [ComponentStatus; 8]) -> Vec<Arc<dyn HealthProbe>> {
    COMPONENT_ORDER
        .iter()
        .zip(statuses)
        .map(|(name, s)| Arc::new(StaticProbe::new(name, s)) as Arc<dyn HealthProbe>)
        .collect()
}

fn aggregator(probes: Vec<Arc<dyn HealthProbe>>, sink: &Arc<InMemoryStore>, settings: &HealthSettings) -> HealthAggregator {
    HealthAggregator::new(probes, Arc::clone(sink) as _, Arc::new(FixedClock::default()), settings)
}

#[tokio::test]
async fn verdict_follows_worst_component() {
    let sink = Arc::new(InMemoryStore::new());
    let settings = HealthSettings::default();

    let cases = [
        ([Healthy; 8], Healthy),
        ([Healthy, Healthy, Warning, Healthy, Healthy, Healthy, Healthy, Healthy], Warning),
        ([Healthy, Healthy, Healthy, Healthy, Healthy, Critical, Healthy, Healthy], Critical),
        ([Warning, Critical, Warning, Healthy, Healthy, Healthy, Healthy, Healthy], Critical),
    ];
    for (statuses, expected) in cases {
        let h = aggregator(battery(statuses), &sink, &settings).check_all().await;
        assert_eq!(h.overall, expected, "statuses {statuses:?}");
        assert_eq!(h.components.len(), 8);
        let names: Vec<&str> = h.components.iter().map(|c| c.component.as_str()).collect();
        assert_eq!(names, COMPONENT_ORDER.to_vec());
    }
}

#[tokio::test(start_paused = true)]
async fn failing_and_hung_probes_are_critical() {
    let sink = Arc::new(InMemoryStore::new());
    let settings = HealthSettings {
        probe_timeout_ms: 500,
        ..HealthSettings::default()
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(StaticProbe::new("website", Healthy)),
        Arc::new(StaticProbe::failing("database", "connection refused")),
        Arc::new(StaticProbe::new("blockchain", Healthy).with_delay(Duration::from_secs(3600))),
    ];

    let h = aggregator(probes, &sink, &settings).check_all().await;

    assert_eq!(h.overall, Critical);
    assert_eq!(h.components[0].status, Healthy);
    assert_eq!(h.components[1].status, Critical);
    assert_eq!(h.components[1].error.as_deref(), Some("connection refused"));
    assert_eq!(h.components[2].status, Critical);
    assert!(h.components[2].error.as_deref().unwrap_or("").contains("timed out"));
    assert!(h.check_duration_ms >= 500 && h.check_duration_ms < 3_600_000);
}

#[tokio::test]
async fn cycles_are_persisted_and_kept_in_bounded_history() {
    let sink = Arc::new(InMemoryStore::new());
    let settings = HealthSettings {
        history_capacity: 3,
        ..HealthSettings::default()
    };
    let agg = aggregator(battery([Healthy; 8]), &sink, &settings);

    for _ in 0..5 {
        agg.check_all().await;
    }

    let history = agg.history();
    assert_eq!(history.len(), 3);
    assert_eq!(sink.system_health(), history.latest());
    let up = history.uptime_stats();
    assert_eq!(up.total_checks, 3);
    assert_eq!(up.successful_checks, 3);
    assert_eq!(up.uptime_percentage, 100.0);
}

#[tokio::test]
async fn persistence_failure_does_not_lose_the_cycle() {
    let sink = Arc::new(InMemoryStore::new());
    sink.fail_health(StoreError::Unavailable("db down".to_string()));
    let agg = aggregator(battery([Healthy; 8]), &sink, &HealthSettings::default());

    let report = agg.check_all_report().await;

    assert!(report.persistence.is_failed());
    assert_eq!(report.health.overall, Healthy);
    assert_eq!(agg.history().len(), 1);
}

#[tokio::test]
async fn uptime_excludes_critical_cycles() {
    let sink = Arc::new(InMemoryStore::new());
    let settings = HealthSettings::default();
    let ok = aggregator(battery([Healthy; 8]), &sink, &settings);
    ok.check_all().await;

    let mut degraded = [Healthy; 8];
    degraded[1] = Critical;
    let history = ok.history();
    let bad = aggregator(battery(degraded), &sink, &settings);
    let h = bad.check_all().await;
    history.push(h);

    let mut warn = [Healthy; 8];
    warn[7] = Warning;
    history.push(aggregator(battery(warn), &sink, &settings).check_all().await);

    let up = history.uptime_stats();
    assert_eq!(up.total_checks, 3);
    assert_eq!(up.successful_checks, 2);
    assert!((up.uptime_percentage - 200.0 / 3.0).abs() < 1e-9);
}
