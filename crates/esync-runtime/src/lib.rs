//! esync-runtime
//!
//! Long-running side of the escrow sync subsystem.
//!
//! - [`PeriodicScheduler`]: idempotent start/stop, an awaited first cycle,
//!   then a repeating `tokio::time` timer. A run-lock skips overlapping ticks.
//! - [`ReconciliationMonitor`] and [`HealthMonitor`]: one scheduler each,
//!   independent of one another.
//! - [`MonitoringServices`]: composition root owning both monitors and the
//!   trade coordinator. Built explicitly; there are no process globals.

mod events;
mod health;
mod reconciliation;
mod scheduler;
mod services;

pub use events::MonitorEvent;
pub use health::HealthMonitor;
pub use reconciliation::{MonitoringStatus, ReconciliationMonitor, SCAN_HISTORY_CAPACITY};
pub use scheduler::{Cycle, PeriodicScheduler};
pub use services::{Collaborators, MonitoringServices, RuntimeSettings};
