use std::sync::Arc;
use std::time::Duration;

use esync_schemas::{ComponentStatus, HealthStatus, PerformanceSummary, SystemHealth};
use esync_store::{Clock, MetricsSink, PersistenceOutcome};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::info;

use crate::{run_probe, HealthHistory, HealthProbe};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Endpoints the HTTP probes call. `None` reports the component as unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEndpoints {
    pub website: Option<String>,
    pub api: Option<String>,
    pub storage: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSettings {
    pub probe_timeout_ms: u64,
    pub slow_response_ms: u64,
    pub history_capacity: usize,
    pub memory_warn_mb: u64,
    pub memory_critical_mb: u64,
    pub lag_warn_ms: u64,
    pub endpoints: ProbeEndpoints,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 10_000,
            slow_response_ms: 2_000,
            history_capacity: crate::DEFAULT_HISTORY_CAPACITY,
            memory_warn_mb: 512,
            memory_critical_mb: 1024,
            lag_warn_ms: 100,
            endpoints: ProbeEndpoints::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pure aggregation
// ---------------------------------------------------------------------------

/// critical > warning > healthy. `unknown` components never raise the
/// verdict, so a set with no critical or warning component is healthy.
pub fn derive_overall(components: &[HealthStatus]) -> ComponentStatus {
    let has = |s: ComponentStatus| components.iter().any(|c| c.status == s);
    if has(ComponentStatus::Critical) {
        ComponentStatus::Critical
    } else if has(ComponentStatus::Warning) {
        ComponentStatus::Warning
    } else {
        ComponentStatus::Healthy
    }
}

/// Average and extremes over components that reported a response time.
/// Ties keep the earliest component in battery order.
pub fn summarize_performance(components: &[HealthStatus]) -> PerformanceSummary {
    let timed: Vec<(&str, u64)> = components
        .iter()
        .filter_map(|c| c.response_time_ms.map(|ms| (c.component.as_str(), ms)))
        .collect();

    if timed.is_empty() {
        return PerformanceSummary {
            average_response_time_ms: 0.0,
            slowest_component: None,
            fastest_component: None,
        };
    }

    let sum: u64 = timed.iter().map(|(_, ms)| *ms).sum();
    let mut slowest = timed[0];
    let mut fastest = timed[0];
    for &(name, ms) in &timed[1..] {
        if ms > slowest.1 {
            slowest = (name, ms);
        }
        if ms < fastest.1 {
            fastest = (name, ms);
        }
    }

    PerformanceSummary {
        average_response_time_ms: sum as f64 / timed.len() as f64,
        slowest_component: Some(slowest.0.to_string()),
        fastest_component: Some(fastest.0.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// One health cycle and the outcome of persisting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckReport {
    pub health: SystemHealth,
    pub persistence: PersistenceOutcome,
}

pub struct HealthAggregator {
    probes: Vec<Arc<dyn HealthProbe>>,
    sink: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    history: Arc<HealthHistory>,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(
        probes: Vec<Arc<dyn HealthProbe>>,
        sink: Arc<dyn MetricsSink>,
        clock: Arc<dyn Clock>,
        settings: &HealthSettings,
    ) -> Self {
        Self {
            probes,
            sink,
            clock,
            history: Arc::new(HealthHistory::with_capacity(settings.history_capacity)),
            probe_timeout: Duration::from_millis(settings.probe_timeout_ms.max(1)),
        }
    }

    pub fn history(&self) -> Arc<HealthHistory> {
        Arc::clone(&self.history)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.probes.iter().map(|p| p.component().to_string()).collect()
    }

    pub async fn check_all(&self) -> SystemHealth {
        self.check_all_report().await.health
    }

    /// Run every probe in order, persist the result and append it to history.
    pub async fn check_all_report(&self) -> HealthCheckReport {
        let started = Instant::now();

        let mut components = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            components.push(run_probe(probe.as_ref(), self.probe_timeout, || self.clock.now()).await);
        }

        let health = SystemHealth {
            overall: derive_overall(&components),
            performance: summarize_performance(&components),
            components,
            last_updated: self.clock.now(),
            check_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            overall = health.overall.as_str(),
            duration_ms = health.check_duration_ms,
            avg_ms = health.performance.average_response_time_ms,
            "health check complete"
        );

        let persistence =
            PersistenceOutcome::record("system_health", self.sink.put_system_health(&health).await);
        self.history.push(health.clone());

        HealthCheckReport {
            health,
            persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn st(name: &str, status: ComponentStatus, ms: Option<u64>) -> HealthStatus {
        HealthStatus {
            component: name.to_string(),
            status,
            response_time_ms: ms,
            last_check: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            error: None,
            details: Default::default(),
        }
    }

    use ComponentStatus::*;

    #[test]
    fn overall_precedence() {
        assert_eq!(derive_overall(&[st("a", Healthy, None), st("b", Healthy, None)]), Healthy);
        assert_eq!(derive_overall(&[st("a", Healthy, None), st("b", Warning, None)]), Warning);
        assert_eq!(
            derive_overall(&[st("a", Warning, None), st("b", Critical, None), st("c", Healthy, None)]),
            Critical
        );
    }

    #[test]
    fn unknown_does_not_raise_verdict() {
        assert_eq!(derive_overall(&[]), Healthy);
        assert_eq!(derive_overall(&[st("a", Unknown, None)]), Healthy);
        assert_eq!(derive_overall(&[st("a", Unknown, None), st("b", Warning, None)]), Warning);
        assert_eq!(derive_overall(&[st("a", Unknown, None), st("b", Healthy, None)]), Healthy);
    }

    #[test]
    fn performance_over_timed_components_only() {
        let p = summarize_performance(&[
            st("website", Healthy, Some(30)),
            st("database", Healthy, Some(10)),
            st("api", Unknown, None),
            st("network", Healthy, Some(50)),
        ]);
        assert!((p.average_response_time_ms - 30.0).abs() < f64::EPSILON);
        assert_eq!(p.slowest_component.as_deref(), Some("network"));
        assert_eq!(p.fastest_component.as_deref(), Some("database"));
    }

    #[test]
    fn performance_ties_keep_first() {
        let p = summarize_performance(&[st("a", Healthy, Some(5)), st("b", Healthy, Some(5))]);
        assert_eq!(p.slowest_component.as_deref(), Some("a"));
        assert_eq!(p.fastest_component.as_deref(), Some("a"));
    }

    #[test]
    fn performance_empty() {
        let p = summarize_performance(&[st("a", Healthy, None)]);
        assert_eq!(p.average_response_time_ms, 0.0);
        assert!(p.slowest_component.is_none());
    }
}
