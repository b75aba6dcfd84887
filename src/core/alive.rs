//! # Loop liveness tracker with sequence-based ordering.
//!
//! Keeps track of which long-lived loops are currently running, so a shutdown that
//! overruns its grace period can name the loops that are stuck.
//!
//! ```text
//! Daemon ──► Bus ──► listener ──► AliveTracker::update()
//!                                        │
//!                                        ▼
//!                             HashMap<String, LoopState>
//!                                 (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - only `LoopStarting` / `LoopStopped` / `LoopFailed` change alive state
//! - other events carrying a loop name update `seq` only
//! - events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct LoopState {
    last_seq: Option<u64>,
    alive: bool,
}

/// Thread-safe tracker of running loops.
#[derive(Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, LoopState>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its loop.
    ///
    /// Returns true if the alive state was updated.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.task.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(LoopState {
            last_seq: None,
            alive: false,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        match ev.kind {
            EventKind::LoopStarting => {
                entry.alive = true;
                true
            }
            EventKind::LoopStopped | EventKind::LoopFailed => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Returns the sorted names of loops still running.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, task: &str) -> Event {
        Event::new(kind).with_task(task.to_string())
    }

    #[tokio::test]
    async fn test_tracks_loop_lifecycle() {
        let t = AliveTracker::new();
        assert!(t.update(&ev(EventKind::LoopStarting, "watcher")).await);
        assert!(t.update(&ev(EventKind::LoopStarting, "cleaner")).await);
        assert_eq!(t.snapshot().await, vec!["cleaner", "watcher"]);

        assert!(t.update(&ev(EventKind::LoopStopped, "cleaner")).await);
        assert_eq!(t.snapshot().await, vec!["watcher"]);
    }

    #[tokio::test]
    async fn test_stale_events_are_rejected() {
        let t = AliveTracker::new();
        let started = ev(EventKind::LoopStarting, "watcher");
        let failed = ev(EventKind::LoopFailed, "watcher");

        assert!(t.update(&failed).await);
        assert!(!t.update(&started).await);
        assert!(t.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_without_loop_name_are_ignored() {
        let t = AliveTracker::new();
        assert!(!t.update(&Event::new(EventKind::ReloadCompleted)).await);
        assert!(t.snapshot().await.is_empty());
    }
}
