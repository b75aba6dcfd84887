//! Worker policies.
//!
//! This module groups the knobs that control **how** the supervised worker picks up
//! a freshly rendered configuration.
//!
//! ## Contents
//! - [`ReloadPolicy`] restart the worker, or signal it to re-read its config in place
//!
//! ## Quick wiring
//! ```text
//! Config { worker: { reload: ReloadPolicy } }
//!      └─► worker::WorkerProcess::reload() uses:
//!           - Restart → stop() + start()
//!           - Signal  → SIGHUP to the running process
//! ```
//!
//! ## Defaults
//! - `ReloadPolicy::Restart`: the worker in this deployment cannot reload in place.

mod reload;

pub use reload::ReloadPolicy;
