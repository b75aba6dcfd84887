//! # OS signal dispatch.
//!
//! | Signal                     | Action                                   |
//! |----------------------------|------------------------------------------|
//! | `SIGINT` `SIGTERM` `SIGQUIT` | global shutdown                        |
//! | `SIGUSR1`                  | reload (fatal error → shutdown)          |
//! | `SIGCHLD`                  | liveness check (dead worker → shutdown)  |
//! | `SIGUSR2`                  | status probe of the worker (best effort) |
//!
//! Handlers are registered in [`SignalDispatcher::register`], before any loop
//! starts, so a registration failure is a startup error and no signal is lost
//! between startup and the first `select!`.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::Reconciler;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Task;

struct Streams {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
    reload: Signal,
    child: Signal,
    probe: Signal,
}

/// Long-lived loop turning OS signals into daemon actions.
pub struct SignalDispatcher {
    streams: Mutex<Streams>,
    reconciler: Arc<Reconciler>,
    shutdown: CancellationToken,
    bus: Bus,
}

impl SignalDispatcher {
    /// Installs the signal handlers.
    ///
    /// `shutdown` is the runtime token cancelled on a termination signal.
    pub fn register(
        reconciler: Arc<Reconciler>,
        shutdown: CancellationToken,
        bus: Bus,
    ) -> io::Result<Self> {
        let streams = Streams {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
            reload: signal(SignalKind::user_defined1())?,
            child: signal(SignalKind::child())?,
            probe: signal(SignalKind::user_defined2())?,
        };
        Ok(Self {
            streams: Mutex::new(streams),
            reconciler,
            shutdown,
            bus,
        })
    }

    fn request_shutdown(&self, signal: &str) {
        info!(signal, "termination signal received");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown.cancel();
    }
}

#[async_trait]
impl Task for SignalDispatcher {
    fn name(&self) -> &str {
        "signals"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut guard = self.streams.lock().await;
        let s = &mut *guard;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = s.interrupt.recv() => self.request_shutdown("SIGINT"),
                _ = s.terminate.recv() => self.request_shutdown("SIGTERM"),
                _ = s.quit.recv() => self.request_shutdown("SIGQUIT"),
                _ = s.reload.recv() => {
                    self.reconciler.reload("SIGUSR1").await?;
                }
                _ = s.child.recv() => {
                    debug!("SIGCHLD received, checking worker");
                    self.reconciler.check().await?;
                }
                _ = s.probe.recv() => {
                    self.reconciler.probe().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::worker::testing::FakeWorker;
    use nix::sys::signal::{Signal as Sig, raise};
    use serial_test::serial;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn reconciler(base: &Path, worker: FakeWorker, bus: Bus) -> Arc<Reconciler> {
        let main = base.join("hekad.toml");
        fs::write(&main, "").unwrap();
        let cfg = WorkerConfig {
            main_conf_path: main,
            bin_path: "/bin/false".into(),
            conf_dir: worker.conf_dir.clone(),
            reload: Default::default(),
            brokers: BTreeMap::new(),
        };
        Arc::new(Reconciler::new(&cfg, Box::new(worker), bus))
    }

    fn fake(base: &Path) -> FakeWorker {
        let conf_dir = base.join("conf.d");
        fs::create_dir_all(&conf_dir).unwrap();
        FakeWorker::new(conf_dir)
    }

    fn spawn(
        rec: Arc<Reconciler>,
        shutdown: &CancellationToken,
        bus: Bus,
    ) -> JoinHandle<Result<(), TaskError>> {
        let dispatcher = SignalDispatcher::register(rec, shutdown.clone(), bus).unwrap();
        let ctx = shutdown.child_token();
        tokio::spawn(async move { dispatcher.run(ctx).await })
    }

    async fn eventually(mut cond: impl FnMut() -> bool) {
        for _ in 0..250 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    #[serial]
    async fn test_usr1_reloads_and_usr2_probes() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = fake(tmp.path());
        let snapshots = worker.snapshots.clone();
        let probes = worker.probes.clone();
        let bus = Bus::new(64);
        let rec = reconciler(tmp.path(), worker, bus.clone());
        rec.start_worker().await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn(Arc::clone(&rec), &shutdown, bus);

        raise(Sig::SIGUSR1).unwrap();
        eventually(|| snapshots.lock().unwrap().len() == 1).await;
        assert_eq!(snapshots.lock().unwrap()[0], vec![crate::MAIN_CONF_LINK.to_string()]);

        raise(Sig::SIGUSR2).unwrap();
        eventually(|| *probes.lock().unwrap() == 1).await;

        assert!(!shutdown.is_cancelled());
        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_sigterm_requests_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let rec = reconciler(tmp.path(), fake(tmp.path()), bus.clone());

        let shutdown = CancellationToken::new();
        let handle = spawn(rec, &shutdown, bus);

        raise(Sig::SIGTERM).unwrap();
        tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled())
            .await
            .unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownRequested);
    }

    #[tokio::test]
    #[serial]
    async fn test_sigchld_with_dead_worker_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let worker = fake(tmp.path());
        let alive = worker.alive.clone();
        let bus = Bus::new(64);
        let rec = reconciler(tmp.path(), worker, bus.clone());
        rec.start_worker().await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn(rec, &shutdown, bus);

        *alive.lock().unwrap() = false;
        raise(Sig::SIGCHLD).unwrap();
        let res = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res.unwrap_err().as_label(), "task_fatal");
    }
}
