//! esync-trade
//!
//! Trade-creation side of the escrow cache:
//!
//! - [`AtomicMutationCoordinator`] commits a new trade together with every
//!   dependent order-balance update as one all-or-nothing store write.
//! - [`TradeValidator`] checks a requested trade amount against the ledger's
//!   remaining amount before the trade is created.
//!
//! Unlike the monitoring paths, failures here propagate: the caller's
//! invariant (trade exists ⇒ balances updated) depends on them.

mod coordinator;
mod validation;

pub use coordinator::{build_trade_batch, AtomicMutationCoordinator, TradeCommit, TradeCommitError};
pub use validation::{AmountCheck, TradeValidator, ValidationError, ValidationFailure};
