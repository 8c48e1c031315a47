use esync_schemas::{ContractField, ContractValue, LedgerOrderSnapshot};

use crate::LedgerError;

/// Read-only accessor for on-chain escrow state.
///
/// Implementations must be object-safe and `Send + Sync`; engines hold an
/// `Arc<dyn LedgerReader>`.
#[async_trait::async_trait]
pub trait LedgerReader: Send + Sync {
    /// Remaining (raw, decimals-scaled) amount of one escrow order.
    async fn read_order_remaining(
        &self,
        chain_id: u64,
        on_chain_id: &str,
    ) -> Result<LedgerOrderSnapshot, LedgerError>;

    /// Single scalar read from the escrow contract.
    async fn read_contract_field(
        &self,
        chain_id: u64,
        field: ContractField,
    ) -> Result<ContractValue, LedgerError>;

    /// Cheapest possible read, used for reachability checks.
    async fn latest_block(&self, chain_id: u64) -> Result<u64, LedgerError>;
}
