//! # Reconciliation loop: periodic scan of the watched root.
//!
//! ```text
//! every watcher.interval:
//!   spawn_blocking(walk(log_dir)) ──► Vec<Discovery>
//!                                        │
//!                                        ▼
//!                         Reconciler::reconcile(discoveries)
//!                           ├─ registry.add(..) per discovery
//!                           ├─ registry.keep_valid()
//!                           └─ changed? → reload (same lock)
//! ```
//!
//! ## Rules
//! - the first scan happens one interval after start;
//! - a tick that overruns delays the next one, ticks are never bursted;
//! - cancellation ends the loop without a final reload;
//! - a fatal reload error ends the loop with [`TaskError::Fatal`].

mod symlink;
mod walk;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use symlink::resolve;
pub use walk::{Discovery, walk};

use crate::core::Reconciler;
use crate::error::TaskError;
use crate::tasks::Task;

/// Long-lived loop that keeps the registry in sync with the filesystem.
pub struct ScanLoop {
    root: PathBuf,
    period: Duration,
    reconciler: Arc<Reconciler>,
}

impl ScanLoop {
    /// Creates a loop scanning `root` every `period`.
    pub fn new(root: impl Into<PathBuf>, period: Duration, reconciler: Arc<Reconciler>) -> Self {
        Self {
            root: root.into(),
            period,
            reconciler,
        }
    }

    /// Runs one scan immediately and applies it.
    ///
    /// Returns whether a reload happened.
    pub async fn tick(&self) -> Result<bool, TaskError> {
        let root = self.root.clone();
        let discoveries = tokio::task::spawn_blocking(move || walk(&root))
            .await
            .map_err(|err| TaskError::Fatal {
                error: format!("directory walk aborted: {err}"),
            })?;
        Ok(self.reconciler.reconcile(discoveries).await?)
    }
}

#[async_trait]
impl Task for ScanLoop {
    fn name(&self) -> &str {
        "watcher"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }
    }
}
