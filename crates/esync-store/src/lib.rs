//! esync-store
//!
//! Collaborator boundary for the monitoring subsystem. Everything the core
//! engines consume from the outside world is a trait here:
//!
//! - [`LedgerReader`]: read-only escrow contract access.
//! - [`OffchainStore`]: cached order/trade records with atomic batch writes.
//! - [`MetricsSink`] / [`AlertSink`]: durable storage for scan metrics,
//!   health snapshots and mismatch alerts.
//! - [`Clock`]: wall-clock timestamps.
//!
//! Implementations live elsewhere (`esync-ledger`, `esync-db`, and the
//! in-memory fakes in `esync-testkit`).

mod clock;
mod error;
mod ledger;
mod sinks;
mod store;

pub use clock::{Clock, SystemClock};
pub use error::{LedgerError, StoreError};
pub use ledger::LedgerReader;
pub use sinks::{AlertSink, MetricsSink, PersistenceOutcome};
pub use store::{OffchainStore, OrderFields, OrderFilter, WriteOp};
