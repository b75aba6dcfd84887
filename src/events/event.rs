//! # Runtime events emitted by the daemon's loops and components.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Runtime events**: loop lifecycle and shutdown
//! - **Fragment events**: discovery, rejection and eviction of fragment files
//! - **Reload events**: config regeneration and its outcome
//! - **Worker events**: supervised process lifecycle
//!
//! The [`Event`] struct carries the metadata: timestamp, loop name, fragment path,
//! process id and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use feedvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FragmentInvalid)
//!     .with_path("/var/log/app/kafkafeeder.yaml")
//!     .with_reason("there is no topic in fragment");
//!
//! assert_eq!(ev.kind, EventKind::FragmentInvalid);
//! assert_eq!(ev.path.as_deref(), Some("/var/log/app/kafkafeeder.yaml"));
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `task` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `task` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Runtime events ===
    /// Startup step finished: checkpoint files were copied into the journal directory.
    ///
    /// Sets `count` (files copied).
    CheckpointsRestored,

    /// Shutdown requested (OS signal or fatal error).
    ///
    /// Sets `reason` when caused by an error.
    ShutdownRequested,

    /// All loops stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some loops did not stop in time.
    GraceExceeded,

    /// Long-lived loop started.
    ///
    /// Sets `task` (loop name).
    LoopStarting,

    /// Long-lived loop exited after cancellation.
    ///
    /// Sets `task` (loop name).
    LoopStopped,

    /// Long-lived loop exited with a fatal error.
    ///
    /// Sets `task` (loop name) and `reason`.
    LoopFailed,

    // === Fragment events ===
    /// New or changed fragment parsed successfully.
    ///
    /// Sets `path` (canonical fragment path) and `count` (topics).
    FragmentDiscovered,

    /// Fragment could not be parsed; it is tracked with no topics.
    ///
    /// Sets `path` and `reason`.
    FragmentInvalid,

    /// Fragment file disappeared and was forgotten.
    ///
    /// Sets `path`.
    FragmentEvicted,

    /// Fragment could not be compiled; it was left out of the config directory.
    ///
    /// Sets `path` and `reason`.
    FragmentSkipped,

    /// One reconciliation tick finished.
    ///
    /// Sets `count` (tracked fragments) and `reason` (`changed` or `unchanged`).
    ScanCompleted,

    // === Reload events ===
    /// Config regeneration started.
    ///
    /// Sets `reason` (what triggered it).
    ReloadRequested,

    /// Config directory regenerated and worker reloaded.
    ///
    /// Sets `count` (fragments rendered).
    ReloadCompleted,

    /// Config regeneration or worker reload failed (fatal).
    ///
    /// Sets `reason`.
    ReloadFailed,

    // === Worker events ===
    /// Worker process spawned.
    ///
    /// Sets `pid`.
    WorkerStarted,

    /// Worker process could not be spawned.
    ///
    /// Sets `reason`.
    WorkerStartFailed,

    /// Worker process stopped on request.
    ///
    /// Sets `pid` and `reason` (exit status).
    WorkerStopped,

    /// Worker process received an in-place reload signal.
    ///
    /// Sets `pid`.
    WorkerSignaled,

    /// Worker process exited while it was supposed to be running.
    ///
    /// Sets `pid` when known.
    WorkerExited,

    /// Status probe delivered to the worker.
    ///
    /// Sets `pid`.
    WorkerProbed,

    /// Status probe could not be delivered.
    ///
    /// Sets `reason`.
    WorkerProbeFailed,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Loop or subscriber name, if applicable.
    pub task: Option<Arc<str>>,
    /// Fragment path, if applicable.
    pub path: Option<Arc<str>>,
    /// Human-readable reason (errors, trigger, exit status).
    pub reason: Option<Arc<str>>,
    /// Worker process id, if applicable.
    pub pid: Option<u32>,
    /// Counter payload (topics, fragments, files).
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            path: None,
            reason: None,
            pid: None,
            count: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a loop or subscriber name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a fragment path (lossy for non UTF-8 paths).
    #[inline]
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(Arc::from(path.as_ref().to_string_lossy().as_ref()));
        self
    }

    /// Attaches a worker process id.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
