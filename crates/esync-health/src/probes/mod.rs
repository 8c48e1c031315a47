//! Concrete probes and the standard battery.

mod http;
mod ledger;
mod runtime;
mod store;

use std::sync::Arc;
use std::time::Duration;

use esync_store::{LedgerReader, OffchainStore};

pub use http::{classify_http_status, HttpProbe};
pub use ledger::{BlockchainProbe, ContractProbe};
pub use runtime::{parse_vm_rss_bytes, FixedMemory, MemorySampler, PerformanceProbe, ProcSelfStatus};
pub use store::DatabaseProbe;

use crate::{HealthProbe, HealthSettings};

/// Component names of the standard battery, in execution order.
pub const COMPONENT_ORDER: [&str; 8] = [
    "website",
    "database",
    "blockchain",
    "smart_contract",
    "api",
    "storage",
    "network",
    "performance",
];

/// Collaborators the standard battery probes.
#[derive(Clone)]
pub struct ProbeDeps {
    pub store: Arc<dyn OffchainStore>,
    pub ledger: Arc<dyn LedgerReader>,
    /// Chains the `blockchain` probe reads a block height from.
    pub chain_ids: Vec<u64>,
    /// Chain whose escrow contract the `smart_contract` probe reads.
    pub contract_chain_id: Option<u64>,
    pub memory: Arc<dyn MemorySampler>,
}

/// Build the fixed battery of 8 probes in [`COMPONENT_ORDER`].
pub fn standard_battery(deps: ProbeDeps, settings: &HealthSettings) -> Vec<Arc<dyn HealthProbe>> {
    let client = reqwest::Client::new();
    let slow = Duration::from_millis(settings.slow_response_ms);
    let http = |name: &'static str, url: &Option<String>| -> Arc<dyn HealthProbe> {
        Arc::new(HttpProbe::new(name, url.clone(), client.clone(), slow))
    };

    vec![
        http("website", &settings.endpoints.website),
        Arc::new(DatabaseProbe::new(deps.store)),
        Arc::new(BlockchainProbe::new(deps.ledger.clone(), deps.chain_ids)),
        Arc::new(ContractProbe::new(deps.ledger, deps.contract_chain_id)),
        http("api", &settings.endpoints.api),
        http("storage", &settings.endpoints.storage),
        http("network", &settings.endpoints.network),
        Arc::new(PerformanceProbe::new(
            deps.memory,
            settings.memory_warn_mb,
            settings.memory_critical_mb,
            settings.lag_warn_ms,
        )),
    ]
}
