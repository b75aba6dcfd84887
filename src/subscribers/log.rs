//! # LogWriter: events rendered as `tracing` records.
//!
//! Normal transitions are logged at `info`, recoverable problems at `warn` and
//! fatal ones at `error`. Chatty per-tick events go to `debug`.
//!
//! ## Example output
//! ```text
//! INFO  feedvisor::events: fragment discovered path="/srv/app/kafkafeeder.yaml" topics=2
//! WARN  feedvisor::events: fragment invalid path="/srv/x/kafkafeeder.yaml" reason="there is no topic in fragment"
//! INFO  feedvisor::events: reload completed fragments=3
//! ERROR feedvisor::events: loop failed task="watcher" reason="fatal error: worker restart failed"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "feedvisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let path = e.path.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, subscriber = task, reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = task, reason, "subscriber dropped event")
            }
            EventKind::CheckpointsRestored => {
                info!(target: TARGET, files = e.count, "checkpoints restored")
            }
            EventKind::ShutdownRequested => match e.reason.as_deref() {
                Some(reason) => error!(target: TARGET, reason, "shutdown requested"),
                None => info!(target: TARGET, "shutdown requested"),
            },
            EventKind::AllStoppedWithin => info!(target: TARGET, "all loops stopped"),
            EventKind::GraceExceeded => warn!(target: TARGET, "grace period exceeded"),
            EventKind::LoopStarting => info!(target: TARGET, task, "loop started"),
            EventKind::LoopStopped => info!(target: TARGET, task, "loop stopped"),
            EventKind::LoopFailed => error!(target: TARGET, task, reason, "loop failed"),
            EventKind::FragmentDiscovered => {
                info!(target: TARGET, path, topics = e.count, "fragment discovered")
            }
            EventKind::FragmentInvalid => {
                warn!(target: TARGET, path, reason, "fragment invalid")
            }
            EventKind::FragmentEvicted => info!(target: TARGET, path, "fragment evicted"),
            EventKind::FragmentSkipped => {
                warn!(target: TARGET, path, reason, "fragment skipped")
            }
            EventKind::ScanCompleted => {
                debug!(target: TARGET, fragments = e.count, reason, "scan completed")
            }
            EventKind::ReloadRequested => info!(target: TARGET, reason, "reload requested"),
            EventKind::ReloadCompleted => {
                info!(target: TARGET, fragments = e.count, "reload completed")
            }
            EventKind::ReloadFailed => error!(target: TARGET, reason, "reload failed"),
            EventKind::WorkerStarted => info!(target: TARGET, pid = e.pid, "worker started"),
            EventKind::WorkerStartFailed => {
                error!(target: TARGET, reason, "worker start failed")
            }
            EventKind::WorkerStopped => {
                info!(target: TARGET, pid = e.pid, reason, "worker stopped")
            }
            EventKind::WorkerSignaled => {
                info!(target: TARGET, pid = e.pid, "worker signaled to reload")
            }
            EventKind::WorkerExited => {
                error!(target: TARGET, pid = e.pid, "worker exited prematurely")
            }
            EventKind::WorkerProbed => debug!(target: TARGET, pid = e.pid, "worker probed"),
            EventKind::WorkerProbeFailed => {
                warn!(target: TARGET, reason, "worker probe failed")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
