use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use esync_schemas::{ContractField, ContractValue, LedgerOrderSnapshot};
use esync_store::{Clock, LedgerError, LedgerReader};

use crate::FixedClock;

#[derive(Debug)]
struct Script {
    orders: BTreeMap<(u64, String), Result<u128, LedgerError>>,
    fields: BTreeMap<(u64, ContractField), Result<ContractValue, LedgerError>>,
    block: Result<u64, LedgerError>,
    delay: Option<Duration>,
    order_reads: usize,
}

/// `LedgerReader` answering from a script.
///
/// Unscripted orders and fields read as `Unavailable`. An optional delay is
/// applied with `tokio::time::sleep`, so paused-clock tests control it.
#[derive(Debug)]
pub struct ScriptedLedger {
    script: Mutex<Script>,
    clock: FixedClock,
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                orders: BTreeMap::new(),
                fields: BTreeMap::new(),
                block: Ok(1),
                delay: None,
                order_reads: 0,
            }),
            clock: FixedClock::default(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Script the raw (decimals-scaled) remaining amount of an order.
    pub fn set_remaining(&self, chain_id: u64, on_chain_id: &str, raw: u128) {
        self.lock()
            .orders
            .insert((chain_id, on_chain_id.to_string()), Ok(raw));
    }

    pub fn fail_order(&self, chain_id: u64, on_chain_id: &str, err: LedgerError) {
        self.lock()
            .orders
            .insert((chain_id, on_chain_id.to_string()), Err(err));
    }

    pub fn set_field(&self, chain_id: u64, field: ContractField, value: ContractValue) {
        self.lock().fields.insert((chain_id, field), Ok(value));
    }

    pub fn fail_field(&self, chain_id: u64, field: ContractField, err: LedgerError) {
        self.lock().fields.insert((chain_id, field), Err(err));
    }

    /// Owner, fee and paused=false for `chain_id`.
    pub fn with_healthy_contract(self, chain_id: u64) -> Self {
        let owner = "0x0000000000000000000000000000000000000001".to_string();
        self.set_field(chain_id, ContractField::Owner, ContractValue::Address(owner));
        self.set_field(chain_id, ContractField::Fee, ContractValue::Uint(25));
        self.set_field(chain_id, ContractField::Paused, ContractValue::Bool(false));
        self
    }

    pub fn set_block(&self, block: Result<u64, LedgerError>) {
        self.lock().block = block;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    pub fn order_reads(&self) -> usize {
        self.lock().order_reads
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait::async_trait]
impl LedgerReader for ScriptedLedger {
    async fn read_order_remaining(
        &self,
        chain_id: u64,
        on_chain_id: &str,
    ) -> Result<LedgerOrderSnapshot, LedgerError> {
        self.pause().await;
        let raw = {
            let mut g = self.lock();
            g.order_reads += 1;
            g.orders
                .get(&(chain_id, on_chain_id.to_string()))
                .cloned()
                .unwrap_or_else(|| {
                    Err(LedgerError::Unavailable(format!(
                        "no scripted amount for order {on_chain_id} on chain {chain_id}"
                    )))
                })?
        };
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
        self.pause().await;
        self.lock()
            .fields
            .get(&(chain_id, field))
            .cloned()
            .unwrap_or_else(|| {
                Err(LedgerError::Unavailable(format!(
                    "no scripted {} on chain {chain_id}",
                    field.as_str()
                )))
            })
    }

    async fn latest_block(&self, _chain_id: u64) -> Result<u64, LedgerError> {
        self.pause().await;
        self.lock().block.clone()
    }
}
