use std::sync::Arc;

use esync_schemas::{ComponentStatus, ContractField, ContractValue};
use esync_store::LedgerReader;
use serde_json::{json, Map, Value};

use crate::{HealthProbe, ProbeError, ProbeReport};

/// Reads the latest block height of every configured chain.
pub struct BlockchainProbe {
    ledger: Arc<dyn LedgerReader>,
    chain_ids: Vec<u64>,
}

impl BlockchainProbe {
    pub fn new(ledger: Arc<dyn LedgerReader>, chain_ids: Vec<u64>) -> Self {
        Self { ledger, chain_ids }
    }
}

#[async_trait::async_trait]
impl HealthProbe for BlockchainProbe {
    fn component(&self) -> &str {
        "blockchain"
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        if self.chain_ids.is_empty() {
            return Ok(ProbeReport::degraded(
                ComponentStatus::Unknown,
                "no chains configured",
            ));
        }

        let mut blocks = Map::new();
        for chain_id in &self.chain_ids {
            let height = self.ledger.latest_block(*chain_id).await?;
            blocks.insert(chain_id.to_string(), json!(height));
        }
        Ok(ProbeReport::healthy().detail("latest_blocks", Value::Object(blocks)))
    }
}

/// Reads `owner`, `fee` and `paused` from the escrow contract concurrently.
/// All three must succeed.
pub struct ContractProbe {
    ledger: Arc<dyn LedgerReader>,
    chain_id: Option<u64>,
}

impl ContractProbe {
    pub fn new(ledger: Arc<dyn LedgerReader>, chain_id: Option<u64>) -> Self {
        Self { ledger, chain_id }
    }
}

fn value_json(v: &ContractValue) -> Value {
    match v {
        ContractValue::Address(a) => json!(a),
        // u128 exceeds JSON's safe integer range.
        ContractValue::Uint(n) => json!(n.to_string()),
        ContractValue::Bool(b) => json!(b),
    }
}

#[async_trait::async_trait]
impl HealthProbe for ContractProbe {
    fn component(&self) -> &str {
        "smart_contract"
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        let Some(chain_id) = self.chain_id else {
            return Ok(ProbeReport::degraded(
                ComponentStatus::Unknown,
                "no escrow contract configured",
            ));
        };

        let (owner, fee, paused) = tokio::try_join!(
            self.ledger.read_contract_field(chain_id, ContractField::Owner),
            self.ledger.read_contract_field(chain_id, ContractField::Fee),
            self.ledger.read_contract_field(chain_id, ContractField::Paused),
        )?;

        let report = if matches!(paused, ContractValue::Bool(true)) {
            ProbeReport::degraded(ComponentStatus::Warning, "escrow contract is paused")
        } else {
            ProbeReport::healthy()
        };

        Ok(report
            .detail("chain_id", chain_id)
            .detail("owner", value_json(&owner))
            .detail("fee", value_json(&fee))
            .detail("paused", value_json(&paused)))
    }
}
