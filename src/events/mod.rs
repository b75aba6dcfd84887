//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish and
//! subscribe to state transitions of the daemon.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Daemon`, `runner::run_loop`, `ScanLoop`, `Reconciler`,
//!   `WorkerProcess`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the daemon listener (fans out to `SubscriberSet` and updates
//!   `AliveTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
