//! esync-health
//!
//! Aggregated health of the escrow sync deployment.
//!
//! - A fixed, ordered battery of probes (`website`, `database`, `blockchain`,
//!   `smart_contract`, `api`, `storage`, `network`, `performance`).
//! - Every probe runs under a deadline and never fails the cycle: errors and
//!   timeouts become `critical` statuses.
//! - The aggregated [`SystemHealth`](esync_schemas::SystemHealth) is written
//!   to the metrics sink (overwrite) and appended to a bounded history.

mod aggregator;
mod history;
mod probe;
pub mod probes;

pub use aggregator::{
    derive_overall, summarize_performance, HealthAggregator, HealthCheckReport, HealthSettings,
    ProbeEndpoints,
};
pub use history::{HealthHistory, DEFAULT_HISTORY_CAPACITY};
pub use probe::{run_probe, HealthProbe, ProbeError, ProbeReport};
pub use probes::{
    standard_battery, FixedMemory, MemorySampler, ProbeDeps, ProcSelfStatus, COMPONENT_ORDER,
};
