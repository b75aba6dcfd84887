//! # Reload policies for the supervised worker.
//!
//! [`ReloadPolicy`] determines what "reload" means for the worker process.
//!
//! - [`ReloadPolicy::Restart`] stop the process and start a new one (default).
//! - [`ReloadPolicy::Signal`] send `SIGHUP` and let the process re-read its config.
//!
//! ## Choosing the right policy
//!
//! **Worker without live reload** (the current heka build):
//! ```text
//! ReloadPolicy::Restart   → SIGTERM, wait, spawn with the same arguments
//! ```
//!
//! **Worker with live reload**:
//! ```text
//! ReloadPolicy::Signal    → SIGHUP, process keeps its pid
//! ```
//!
//! Callers always go through `Worker::reload`; switching policy never changes them.

use serde::Deserialize;

/// Policy controlling how the worker applies a new configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Stop and start the worker (default).
    #[default]
    Restart,
    /// Ask the running worker to reload in place via `SIGHUP`.
    Signal,
}
