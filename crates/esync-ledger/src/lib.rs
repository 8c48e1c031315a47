//! esync-ledger
//!
//! [`RpcLedgerReader`]: the escrow contract read over Ethereum JSON-RPC.
//!
//! Calls are ABI-encoded with `alloy-sol-types` and sent as `eth_call`
//! against `latest`. One endpoint per chain id. Every failure maps onto
//! [`esync_store::LedgerError`]; nothing here retries.

mod abi;
mod rpc;

pub use abi::{
    decode_fee, decode_owner, decode_paused, decode_remaining, parse_order_id, IEscrow,
};
pub use rpc::{ChainEndpoint, RpcLedgerReader, DEFAULT_RPC_TIMEOUT};
