//! # Supervised worker process.
//!
//! The daemon drives exactly one external worker. [`Worker`] is the seam the
//! [`Reconciler`](crate::Reconciler) talks to; [`WorkerProcess`] is the real
//! implementation on top of `tokio::process`.
//!
//! ## State machine
//! ```text
//!            start()                      stop()
//! Stopped ───────────► Starting ──► Running ───────► Stopping ──► Stopped
//!                         │            │
//!                         │ spawn err  │ reload() [restart]
//!                         ▼            └──► Stopping ──► Starting ──► Running
//!                       Failed
//! ```
//!
//! The worker also keeps an intent flag ("should be running") separate from the
//! OS process state. A dead process is only unhealthy while the intent says it
//! should be running.

mod process;
mod relay;

use async_trait::async_trait;

pub use process::WorkerProcess;

/// Lifecycle state of the supervised process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerState {
    /// No process; nothing requested.
    #[default]
    Stopped,
    /// Spawn in progress.
    Starting,
    /// Process spawned and believed alive.
    Running,
    /// Termination requested, waiting for exit.
    Stopping,
    /// Spawn failed, or the process died while it should have been running.
    Failed,
}

impl WorkerState {
    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            WorkerState::Stopped => "stopped",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Failed => "failed",
        }
    }
}

/// Control surface of the supervised process.
///
/// Every call is made with the reconciler lock held, so implementations never see
/// two operations at once.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Spawns the process and marks it as intended to run.
    ///
    /// The intent is set even when spawning fails. Returns false on failure.
    async fn start(&mut self) -> bool;

    /// Marks the process as intended to stop, terminates it and waits for exit.
    async fn stop(&mut self);

    /// Makes the process pick up the current config directory.
    async fn reload(&mut self) -> bool;

    /// Returns false only if the process should be running but is not.
    fn is_healthy(&mut self) -> bool;

    /// Asks the process to report its status into its own log (best effort).
    fn probe(&self) -> bool;

    /// Current lifecycle state.
    fn state(&self) -> WorkerState;

    /// OS process id while a process is held.
    fn pid(&self) -> Option<u32>;
}
