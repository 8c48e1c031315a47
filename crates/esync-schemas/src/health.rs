use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verdict of a single probe, or of the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Warning => "warning",
            ComponentStatus::Critical => "critical",
            ComponentStatus::Unknown => "unknown",
        }
    }
}

/// Result of one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub component: String,
    pub status: ComponentStatus,
    pub response_time_ms: Option<u64>,
    pub last_check: DateTime<Utc>,
    pub error: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl HealthStatus {
    pub fn critical(
        component: impl Into<String>,
        error: impl Into<String>,
        response_time_ms: Option<u64>,
        last_check: DateTime<Utc>,
    ) -> Self {
        Self {
            component: component.into(),
            status: ComponentStatus::Critical,
            response_time_ms,
            last_check,
            error: Some(error.into()),
            details: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean over probes that reported a response time; 0 when none did.
    pub average_response_time_ms: f64,
    pub slowest_component: Option<String>,
    pub fastest_component: Option<String>,
}

/// One full health cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall: ComponentStatus,
    pub components: Vec<HealthStatus>,
    pub last_updated: DateTime<Utc>,
    pub check_duration_ms: u64,
    pub performance: PerformanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeStats {
    pub uptime_percentage: f64,
    pub total_checks: u64,
    pub successful_checks: u64,
}
