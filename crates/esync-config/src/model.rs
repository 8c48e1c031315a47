use std::collections::BTreeSet;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed view of the merged config. Every field has a default, so an empty
/// config is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscrowSyncConfig {
    pub reconciliation: ReconciliationConfig,
    pub health: HealthConfig,
    pub chains: Vec<ChainConfig>,
    pub daemon: DaemonConfig,
    pub database: DatabaseConfig,
    pub autostart: AutostartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconciliationConfig {
    pub interval_ms: u64,
    pub batch_size: usize,
    /// Absolute divergence tolerated without a corrective write.
    pub tolerance: Decimal,
    pub alert_medium: Decimal,
    pub alert_high: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 300_000,
            batch_size: 5,
            tolerance: Decimal::new(1, 6),
            alert_medium: Decimal::new(1, 2),
            alert_high: Decimal::new(1, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    pub interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub slow_response_ms: u64,
    pub history_capacity: usize,
    pub memory_warn_mb: u64,
    pub memory_critical_mb: u64,
    pub lag_warn_ms: u64,
    pub endpoints: EndpointsConfig,
    /// Chain whose escrow contract the `smart_contract` probe reads.
    /// Defaults to the first configured chain.
    pub contract_chain_id: Option<u64>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            probe_timeout_ms: 10_000,
            slow_response_ms: 2_000,
            history_capacity: 100,
            memory_warn_mb: 512,
            memory_critical_mb: 1024,
            lag_warn_ms: 100,
            endpoints: EndpointsConfig::default(),
            contract_chain_id: None,
        }
    }
}

/// Plain URLs of the HTTP-probed components. Unset components report unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointsConfig {
    pub website: Option<String>,
    pub api: Option<String>,
    pub storage: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// NAME of the env var holding the JSON-RPC URL.
    pub rpc_url_env: String,
    pub escrow_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub bind: String,
    pub heartbeat_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8899".to_string(),
            heartbeat_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// NAME of the env var holding the Postgres URL.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "ESYNC_DATABASE_URL".to_string(),
            max_connections: 5,
        }
    }
}

/// Which schedulers the daemon starts on boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutostartConfig {
    pub reconciliation: bool,
    pub health: bool,
}

impl EscrowSyncConfig {
    pub fn validate(&self) -> Result<()> {
        let r = &self.reconciliation;
        if r.interval_ms == 0 {
            bail!("CONFIG_INVALID reconciliation.interval_ms must be > 0");
        }
        if r.batch_size == 0 {
            bail!("CONFIG_INVALID reconciliation.batch_size must be > 0");
        }
        if r.tolerance < Decimal::ZERO {
            bail!("CONFIG_INVALID reconciliation.tolerance must be >= 0");
        }
        if r.alert_medium <= Decimal::ZERO || r.alert_medium > r.alert_high {
            bail!(
                "CONFIG_INVALID alert thresholds require 0 < alert_medium ({}) <= alert_high ({})",
                r.alert_medium,
                r.alert_high
            );
        }

        let h = &self.health;
        if h.interval_ms == 0 || h.probe_timeout_ms == 0 {
            bail!("CONFIG_INVALID health.interval_ms and health.probe_timeout_ms must be > 0");
        }
        if h.history_capacity == 0 {
            bail!("CONFIG_INVALID health.history_capacity must be > 0");
        }
        if h.memory_warn_mb > h.memory_critical_mb {
            bail!("CONFIG_INVALID health.memory_warn_mb exceeds memory_critical_mb");
        }

        let mut seen = BTreeSet::new();
        for c in &self.chains {
            if !seen.insert(c.chain_id) {
                bail!("CONFIG_INVALID duplicate chain_id {}", c.chain_id);
            }
            if c.rpc_url_env.trim().is_empty() {
                bail!("CONFIG_INVALID chain {} has an empty rpc_url_env", c.chain_id);
            }
        }
        if let Some(id) = h.contract_chain_id {
            if !seen.contains(&id) {
                bail!("CONFIG_INVALID health.contract_chain_id {id} is not a configured chain");
            }
        }
        Ok(())
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.chain_id).collect()
    }

    pub fn contract_chain_id(&self) -> Option<u64> {
        self.health
            .contract_chain_id
            .or_else(|| self.chains.first().map(|c| c.chain_id))
    }
}
