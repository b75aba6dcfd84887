//! # Daemon: startup, loop supervision and graceful shutdown.
//!
//! ## High-level architecture
//! ```text
//! run():
//!   subscriber_listener(): Bus ─► AliveTracker::update + SubscriberSet::emit
//!
//!   startup (linear, first failure aborts with RuntimeError::Startup):
//!     1. restore checkpoints       checkpoint_dir ─► journal_dir
//!     2. build Reconciler          registry + worker + compiler
//!     3. reset config dir          clear + link hekad.toml
//!     4. register signal handlers
//!
//!   spawn loops (JoinSet, child tokens of runtime_token):
//!     worker   ── start worker, wait, stop worker
//!     signals  ── SIGINT/TERM/QUIT, SIGUSR1, SIGCHLD, SIGUSR2
//!     watcher  ── periodic scan + reconcile
//!     cleaner  ── periodic retention stub
//!
//!   runtime_token.cancelled()   (signal, fatal loop error or shutdown_token())
//!     └─► wait_all_with_grace(cfg.grace):
//!            ├─ all joined      → AllStoppedWithin
//!            └─ timeout         → GraceExceeded (stuck loops from AliveTracker)
//! ```
//!
//! ## Rules
//! - nothing is spawned before every startup step succeeded;
//! - a fatal loop error is returned as [`RuntimeError::Fatal`] once every loop stopped;
//! - events published during the shutdown are still delivered to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::alive::AliveTracker;
use super::cleaner::Cleaner;
use super::checkpoints;
use super::reconcile::Reconciler;
use super::runner::run_loop;
use super::signals::SignalDispatcher;
use super::worker_loop::WorkerLoop;
use crate::config::Config;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::scan::ScanLoop;
use crate::subscribers::SubscriberSet;
use crate::tasks::TaskRef;
use crate::worker::{Worker, WorkerProcess};

/// The assembled daemon. Build it with [`Daemon::builder`](crate::Daemon::builder).
pub struct Daemon {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) subs: Arc<SubscriberSet>,
    pub(super) alive: Arc<AliveTracker>,
    pub(super) runtime_token: CancellationToken,
    pub(super) worker: Option<Box<dyn Worker>>,
}

impl Daemon {
    /// Returns a token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.runtime_token.clone()
    }

    /// Runs the daemon until shutdown.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let listener_done = CancellationToken::new();
        let listener = self.subscriber_listener(listener_done.clone());

        let outcome = match self.startup() {
            Ok(loops) => self.supervise(loops).await,
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::ShutdownRequested).with_reason(err.to_string()),
                );
                Err(err)
            }
        };

        listener_done.cancel();
        let _ = listener.await;
        if let Ok(subs) = Arc::try_unwrap(self.subs) {
            subs.shutdown().await;
        }
        outcome
    }

    fn startup(&mut self) -> Result<Vec<TaskRef>, RuntimeError> {
        let restored = checkpoints::restore(&self.cfg.checkpoint_dir, &self.cfg.journal_dir)
            .map_err(|e| RuntimeError::startup("checkpoint_restore", e))?;
        self.bus
            .publish(Event::new(EventKind::CheckpointsRestored).with_count(restored));

        let worker: Box<dyn Worker> = match self.worker.take() {
            Some(worker) => worker,
            None => Box::new(WorkerProcess::from_config(&self.cfg.worker, self.bus.clone())),
        };
        let reconciler = Arc::new(Reconciler::new(&self.cfg.worker, worker, self.bus.clone()));
        reconciler
            .reset_conf_dir()
            .map_err(|e| RuntimeError::startup("conf_dir", e))?;

        let signals = SignalDispatcher::register(
            Arc::clone(&reconciler),
            self.runtime_token.clone(),
            self.bus.clone(),
        )
        .map_err(|e| RuntimeError::startup("signals", e))?;

        let worker_loop: TaskRef = Arc::new(WorkerLoop::new(Arc::clone(&reconciler)));
        let signals: TaskRef = Arc::new(signals);
        let watcher: TaskRef = Arc::new(ScanLoop::new(
            &self.cfg.log_dir,
            self.cfg.watcher.period(),
            Arc::clone(&reconciler),
        ));
        let cleaner: TaskRef = Arc::new(Cleaner::new(self.cfg.cleaner.period()));
        Ok(vec![worker_loop, signals, watcher, cleaner])
    }

    async fn supervise(&self, loops: Vec<TaskRef>) -> Result<(), RuntimeError> {
        let mut set = JoinSet::new();
        for task in loops {
            let token = self.runtime_token.clone();
            let bus = self.bus.clone();
            set.spawn(async move { run_loop(task.as_ref(), &token, &bus).await });
        }

        self.runtime_token.cancelled().await;
        self.wait_all_with_grace(&mut set).await
    }

    /// Joins every loop within the grace period and reports the first fatal error.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<Result<(), TaskError>>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace_period();
        let mut first_error: Option<String> = None;

        let joined = tokio::time::timeout(grace, async {
            while let Some(res) = set.join_next().await {
                let err = match res {
                    Ok(Ok(())) => continue,
                    Ok(Err(err)) => err.to_string(),
                    Err(join_err) => format!("loop panicked: {join_err}"),
                };
                first_error.get_or_insert(err);
            }
        })
        .await;

        if joined.is_err() {
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            let stuck = self.alive.snapshot().await;
            set.abort_all();
            return Err(RuntimeError::GraceExceeded { grace, stuck });
        }
        self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        match first_error {
            Some(error) => Err(RuntimeError::Fatal { error }),
            None => Ok(()),
        }
    }

    /// Forwards bus events to the alive tracker and the subscribers until `done`,
    /// then drains what is still buffered.
    fn subscriber_listener(&self, done: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let alive = Arc::clone(&self.alive);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            subs.emit(&ev);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged behind");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = done.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            alive.update(&ev).await;
                            subs.emit(&ev);
                        }
                        break;
                    }
                }
            }
        })
    }
}
