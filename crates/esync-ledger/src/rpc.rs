use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Context};
use esync_config::{EscrowSyncConfig, ResolvedSecrets};
use esync_schemas::{ContractField, ContractValue, LedgerOrderSnapshot};
use esync_store::{Clock, LedgerError, LedgerReader};
use serde_json::{json, Value};
use tracing::debug;

use crate::abi::{decode_fee, decode_owner, decode_paused, decode_remaining, parse_order_id, IEscrow};

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC endpoint and escrow contract of one chain.
#[derive(Clone)]
pub struct ChainEndpoint {
    pub rpc_url: String,
    pub escrow: Address,
}

// RPC URLs commonly embed provider keys.
impl std::fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEndpoint")
            .field("rpc_url", &"<REDACTED>")
            .field("escrow", &self.escrow)
            .finish()
    }
}

#[derive(Clone)]
pub struct RpcLedgerReader {
    endpoints: BTreeMap<u64, ChainEndpoint>,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RpcLedgerReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerReader")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl RpcLedgerReader {
    pub fn new(
        endpoints: BTreeMap<u64, ChainEndpoint>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build rpc http client")?;
        Ok(Self {
            endpoints,
            client,
            clock,
        })
    }

    /// One endpoint per configured chain; URLs come from resolved secrets.
    pub fn from_config(
        cfg: &EscrowSyncConfig,
        secrets: &ResolvedSecrets,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let mut endpoints = BTreeMap::new();
        for chain in &cfg.chains {
            let rpc_url = secrets
                .rpc_urls
                .get(&chain.chain_id)
                .cloned()
                .ok_or_else(|| anyhow!("no rpc url resolved for chain {}", chain.chain_id))?;
            let escrow = Address::from_str(&chain.escrow_address).with_context(|| {
                format!("chain {}: invalid escrow_address", chain.chain_id)
            })?;
            endpoints.insert(chain.chain_id, ChainEndpoint { rpc_url, escrow });
        }
        Self::new(endpoints, DEFAULT_RPC_TIMEOUT, clock)
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.endpoints.keys().copied().collect()
    }

    fn endpoint(&self, chain_id: u64) -> Result<&ChainEndpoint, LedgerError> {
        self.endpoints
            .get(&chain_id)
            .ok_or(LedgerError::UnknownChain(chain_id))
    }

    async fn rpc(&self, url: &str, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{method}: {}", e.without_url())))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LedgerError::Unavailable(format!("{method}: http status {status}")));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{method}: {}", e.without_url())))?;

        if let Some(err) = payload.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
            let msg = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(LedgerError::Unavailable(format!("{method}: rpc error {code}: {msg}")));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Decode(format!("{method}: missing result")))
    }

    async fn eth_call(&self, chain_id: u64, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let ep = self.endpoint(chain_id)?;
        let params = json!([
            {
                "to": format!("{:#x}", ep.escrow),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest"
        ]);
        let result = self.rpc(&ep.rpc_url, "eth_call", params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode("eth_call result is not a string".to_string()))?;
        hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| LedgerError::Decode(format!("eth_call result is not hex: {e}")))
    }
}

#[async_trait::async_trait]
impl LedgerReader for RpcLedgerReader {
    async fn read_order_remaining(
        &self,
        chain_id: u64,
        on_chain_id: &str,
    ) -> Result<LedgerOrderSnapshot, LedgerError> {
        let order_id = parse_order_id(on_chain_id)?;
        let data = IEscrow::getRemainingAmountCall { orderId: order_id }.abi_encode();
        let raw = decode_remaining(&self.eth_call(chain_id, data).await?)?;

        debug!(chain_id, on_chain_id, raw, "ledger remaining amount");
        Ok(LedgerOrderSnapshot {
            chain_id,
            on_chain_id: on_chain_id.to_string(),
            raw_remaining: raw,
            fetched_at: self.clock.now(),
        })
    }

    async fn read_contract_field(
        &self,
        chain_id: u64,
        field: ContractField,
    ) -> Result<ContractValue, LedgerError> {
        match field {
            ContractField::Owner => {
                let out = self.eth_call(chain_id, IEscrow::ownerCall {}.abi_encode()).await?;
                decode_owner(&out).map(ContractValue::Address)
            }
            ContractField::Fee => {
                let out = self.eth_call(chain_id, IEscrow::feeBpsCall {}.abi_encode()).await?;
                decode_fee(&out).map(ContractValue::Uint)
            }
            ContractField::Paused => {
                let out = self.eth_call(chain_id, IEscrow::pausedCall {}.abi_encode()).await?;
                decode_paused(&out).map(ContractValue::Bool)
            }
        }
    }

    async fn latest_block(&self, chain_id: u64) -> Result<u64, LedgerError> {
        let ep = self.endpoint(chain_id)?;
        let result = self.rpc(&ep.rpc_url, "eth_blockNumber", json!([])).await?;
        let s = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode("eth_blockNumber result is not a string".to_string()))?;
        u64::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|e| LedgerError::Decode(format!("block number '{s}': {e}")))
    }
}
