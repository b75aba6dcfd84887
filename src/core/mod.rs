//! Runtime core: orchestration and lifecycle.
//!
//! Public API from this module is [`Daemon`] (with its builder) and the
//! [`Reconciler`], which serializes all access to the registry and the worker.
//!
//! Internal modules:
//! - [`reconcile`]: registry + worker under one lock, reload orchestration;
//! - [`daemon`]: linear startup, loop supervision, graceful shutdown;
//! - [`runner`]: runs one loop and turns a fatal error into a global shutdown;
//! - [`signals`]: OS signal dispatch;
//! - [`worker_loop`]: start/wait/stop lifetime of the worker;
//! - [`cleaner`]: periodic retention task;
//! - [`checkpoints`]: startup checkpoint restore;
//! - [`alive`]: tracks which loops are running.

mod alive;
mod builder;
mod checkpoints;
mod cleaner;
mod daemon;
mod reconcile;
mod runner;
mod signals;
mod worker_loop;

pub use builder::DaemonBuilder;
pub use daemon::Daemon;
pub use reconcile::{MAIN_CONF_LINK, Reconciler};
