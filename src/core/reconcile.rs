//! # Reconciler: the single serialization point of the daemon.
//!
//! Owns the fragment registry and the worker behind one async mutex. Every path
//! that touches either of them (scan ticks, signal-driven reloads, liveness checks,
//! probes, worker start/stop) goes through here.
//!
//! ## Reload orchestration
//! ```text
//! lock ──► clear conf_dir ──► link conf_dir/hekad.toml → main_conf_path
//!      ──► for fragment in registry (path order):
//!              compile ──ok──► write conf_dir/<ident(path)>.toml
//!                      └─err─► FragmentSkipped (no file written)
//!      ──► worker.reload()
//!      ──► unlock
//! ```
//!
//! ## Rules
//! - a failure to prepare the config directory is fatal ([`ReloadError::ConfDir`]);
//! - a worker that cannot be brought back is fatal ([`ReloadError::RestartFailed`]);
//! - one broken or uncompilable fragment never blocks the others;
//! - two reloads never interleave, and a liveness check never sees a worker in the
//!   middle of a restart;
//! - once the worker was stopped on purpose, reloads only track fragments; nothing
//!   brings the worker back until the next [`Reconciler::start_worker`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::compiler::{Compiler, file_name};
use crate::config::WorkerConfig;
use crate::error::ReloadError;
use crate::events::{Bus, Event, EventKind};
use crate::fragments::FragmentRegistry;
use crate::scan::Discovery;
use crate::worker::{Worker, WorkerState};

/// Name of the main config link inside the config directory.
pub const MAIN_CONF_LINK: &str = "hekad.toml";

struct State {
    registry: FragmentRegistry,
    worker: Box<dyn Worker>,
    /// Set by `stop_worker`, cleared by `start_worker`.
    stopped: bool,
}

/// Registry + worker behind one lock, with the reload orchestration on top.
pub struct Reconciler {
    conf_dir: PathBuf,
    main_conf: PathBuf,
    compiler: Compiler,
    bus: Bus,
    state: Mutex<State>,
}

impl Reconciler {
    /// Creates a reconciler with an empty registry.
    pub fn new(cfg: &WorkerConfig, worker: Box<dyn Worker>, bus: Bus) -> Self {
        Self {
            conf_dir: cfg.conf_dir.clone(),
            main_conf: cfg.main_conf_path.clone(),
            compiler: Compiler::new(&cfg.brokers),
            bus,
            state: Mutex::new(State {
                registry: FragmentRegistry::new(),
                worker,
                stopped: false,
            }),
        }
    }

    /// Empties the config directory and re-links the main config into it.
    pub fn reset_conf_dir(&self) -> Result<(), ReloadError> {
        let entries =
            fs::read_dir(&self.conf_dir).map_err(|e| ReloadError::conf_dir(&self.conf_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ReloadError::conf_dir(&self.conf_dir, e))?;
            let path = entry.path();
            remove_entry(&path).map_err(|e| ReloadError::conf_dir(&path, e))?;
        }
        debug!(dir = %self.conf_dir.display(), "config dir cleared");

        let link = self.conf_dir.join(MAIN_CONF_LINK);
        std::os::unix::fs::symlink(&self.main_conf, &link)
            .map_err(|e| ReloadError::conf_dir(&link, e))
    }

    /// Starts the worker.
    pub async fn start_worker(&self) -> Result<(), ReloadError> {
        let mut state = self.state.lock().await;
        state.stopped = false;
        if state.worker.start().await {
            Ok(())
        } else {
            Err(ReloadError::StartFailed)
        }
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// Later reloads no longer restart it.
    pub async fn stop_worker(&self) {
        let mut state = self.state.lock().await;
        state.stopped = true;
        state.worker.stop().await;
    }

    /// Regenerates the config directory and reloads the worker.
    ///
    /// `trigger` is recorded on the `ReloadRequested` event.
    pub async fn reload(&self, trigger: &str) -> Result<(), ReloadError> {
        let mut state = self.state.lock().await;
        self.reload_locked(&mut state, trigger).await
    }

    /// Applies one scan: records discoveries, evicts vanished files and reloads if
    /// anything changed, all under one lock.
    ///
    /// Returns whether a reload happened.
    pub async fn reconcile(&self, discoveries: Vec<Discovery>) -> Result<bool, ReloadError> {
        let mut state = self.state.lock().await;
        let mut changed = false;

        for found in &discoveries {
            match state
                .registry
                .add(&found.observed, &found.canonical, &found.metadata)
            {
                Ok(true) => {
                    changed = true;
                    let topics = state
                        .registry
                        .get(&found.canonical)
                        .map_or(0, |f| f.topics.len());
                    self.bus.publish(
                        Event::new(EventKind::FragmentDiscovered)
                            .with_path(&found.canonical)
                            .with_count(topics),
                    );
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(path = %found.canonical.display(), error = %err, label = err.as_label(), "cannot parse fragment");
                    self.bus.publish(
                        Event::new(EventKind::FragmentInvalid)
                            .with_path(&found.canonical)
                            .with_reason(err.to_string()),
                    );
                }
            }
        }

        let evicted = state.registry.evict_missing();
        for path in &evicted {
            self.bus
                .publish(Event::new(EventKind::FragmentEvicted).with_path(path));
        }
        changed |= !evicted.is_empty();

        self.bus.publish(
            Event::new(EventKind::ScanCompleted)
                .with_count(state.registry.len())
                .with_reason(if changed { "changed" } else { "unchanged" }),
        );

        if changed {
            self.reload_locked(&mut state, "fragments changed").await?;
        }
        Ok(changed)
    }

    /// Fails with [`ReloadError::WorkerDied`] if the worker should run but does not.
    pub async fn check(&self) -> Result<(), ReloadError> {
        let mut state = self.state.lock().await;
        if state.worker.is_healthy() {
            return Ok(());
        }
        self.bus
            .publish(Event::new(EventKind::WorkerExited).with_pid(state.worker.pid()));
        Err(ReloadError::WorkerDied)
    }

    /// Asks the worker for a status report (best effort).
    pub async fn probe(&self) -> bool {
        self.state.lock().await.worker.probe()
    }

    /// Number of tracked fragments.
    pub async fn fragment_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Current worker state.
    pub async fn worker_state(&self) -> WorkerState {
        self.state.lock().await.worker.state()
    }

    async fn reload_locked(&self, state: &mut State, trigger: &str) -> Result<(), ReloadError> {
        if state.stopped {
            debug!(trigger, "worker stopped, reload skipped");
            return Ok(());
        }
        info!(trigger, "reloading configuration");
        self.bus
            .publish(Event::new(EventKind::ReloadRequested).with_reason(trigger));

        if let Err(err) = self.reset_conf_dir() {
            return Err(self.failed(err));
        }
        let rendered = self.render(&state.registry);

        if !state.worker.reload().await {
            return Err(self.failed(ReloadError::RestartFailed));
        }
        self.bus
            .publish(Event::new(EventKind::ReloadCompleted).with_count(rendered));

        for fragment in state.registry.iter() {
            let topics: Vec<&str> = fragment.topics.keys().map(String::as_str).collect();
            debug!(
                path = %fragment.path.display(),
                directory = %fragment.directory.display(),
                ?topics,
                "loaded fragment"
            );
        }
        Ok(())
    }

    /// Writes one compiled file per tracked fragment; returns how many were written.
    fn render(&self, registry: &FragmentRegistry) -> usize {
        let mut rendered = 0;
        for fragment in registry.iter() {
            let text = match self.compiler.compile(fragment) {
                Ok(text) => text,
                Err(err) => {
                    self.skipped(&fragment.path, err.as_label(), err.to_string());
                    continue;
                }
            };
            let target = self.conf_dir.join(file_name(&fragment.path));
            match fs::write(&target, text) {
                Ok(()) => rendered += 1,
                Err(err) => self.skipped(&fragment.path, "write_failed", err.to_string()),
            }
        }
        rendered
    }

    fn skipped(&self, path: &Path, label: &str, reason: String) {
        warn!(path = %path.display(), label, %reason, "fragment left out of config");
        self.bus.publish(
            Event::new(EventKind::FragmentSkipped)
                .with_path(path)
                .with_reason(reason),
        );
    }

    fn failed(&self, err: ReloadError) -> ReloadError {
        self.bus
            .publish(Event::new(EventKind::ReloadFailed).with_reason(err.to_string()));
        err
    }
}

fn remove_entry(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::FRAGMENT_FILE_NAME;
    use crate::scan::walk;
    use crate::worker::testing::FakeWorker;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    const VALID: &str = "topics:\n  app: {topic: app-topic, type: kafkalog, broker: kafka}\n";

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        conf_dir: PathBuf,
        cfg: WorkerConfig,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("logs");
        let conf_dir = tmp.path().join("conf.d");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&conf_dir).unwrap();
        let main = tmp.path().join("hekad.toml");
        fs::write(&main, "[hekad]\n").unwrap();

        let mut brokers = BTreeMap::new();
        brokers.insert("kafka".to_string(), vec!["k1:9092".to_string()]);
        let cfg = WorkerConfig {
            main_conf_path: main,
            bin_path: PathBuf::from("/bin/false"),
            conf_dir: conf_dir.clone(),
            reload: Default::default(),
            brokers,
        };
        Fixture {
            _tmp: tmp,
            root,
            conf_dir,
            cfg,
        }
    }

    fn write_fragment(dir: &Path, body: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(FRAGMENT_FILE_NAME);
        fs::write(&path, body).unwrap();
        path
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test]
    async fn test_reset_conf_dir_clears_and_links_main_config() {
        let fx = fixture();
        fs::write(fx.conf_dir.join("stale.toml"), "x").unwrap();
        fs::create_dir_all(fx.conf_dir.join("nested/deeper")).unwrap();
        let rec = Reconciler::new(&fx.cfg, Box::new(FakeWorker::new(&fx.conf_dir)), Bus::default());

        rec.reset_conf_dir().unwrap();
        assert_eq!(listing(&fx.conf_dir), vec![MAIN_CONF_LINK.to_string()]);
        let link = fx.conf_dir.join(MAIN_CONF_LINK);
        assert_eq!(fs::read_link(&link).unwrap(), fx.cfg.main_conf_path);

        // idempotent: the old link is removed first
        rec.reset_conf_dir().unwrap();
        assert_eq!(listing(&fx.conf_dir), vec![MAIN_CONF_LINK.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_conf_dir_is_fatal() {
        let fx = fixture();
        let mut cfg = fx.cfg.clone();
        cfg.conf_dir = fx.root.join("absent");
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let rec = Reconciler::new(&cfg, Box::new(FakeWorker::new(&cfg.conf_dir)), bus);

        let err = rec.reload("test").await.unwrap_err();
        assert_eq!(err.as_label(), "reload_conf_dir");
        assert_eq!(drain(&mut rx), vec![EventKind::ReloadRequested, EventKind::ReloadFailed]);
    }

    #[tokio::test]
    async fn test_reconcile_renders_changes_and_evictions() {
        let fx = fixture();
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let worker = FakeWorker::new(&fx.conf_dir);
        let snapshots = worker.snapshots.clone();
        let rec = Reconciler::new(&fx.cfg, Box::new(worker), bus);

        let fragment = write_fragment(&fx.root.join("app"), VALID);
        let compiled = file_name(&fragment);

        assert!(rec.reconcile(walk(&fx.root)).await.unwrap());
        let mut expected = vec![compiled.clone(), MAIN_CONF_LINK.to_string()];
        expected.sort();
        assert_eq!(listing(&fx.conf_dir), expected);
        let text = fs::read_to_string(fx.conf_dir.join(&compiled)).unwrap();
        assert!(text.contains("topic = \"app-topic\""));
        assert!(text.contains("addrs = [\"k1:9092\"]"));

        // nothing changed on disk: no reload
        assert!(!rec.reconcile(walk(&fx.root)).await.unwrap());
        assert_eq!(snapshots.lock().unwrap().len(), 1);

        fs::remove_file(&fragment).unwrap();
        assert!(rec.reconcile(walk(&fx.root)).await.unwrap());
        assert_eq!(listing(&fx.conf_dir), vec![MAIN_CONF_LINK.to_string()]);
        assert_eq!(rec.fragment_count().await, 0);

        let kinds = drain(&mut rx);
        assert!(kinds.contains(&EventKind::FragmentDiscovered));
        assert!(kinds.contains(&EventKind::FragmentEvicted));
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::ReloadCompleted).count(), 2);
    }

    #[tokio::test]
    async fn test_broken_fragment_does_not_trigger_reload() {
        let fx = fixture();
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let rec = Reconciler::new(&fx.cfg, Box::new(FakeWorker::new(&fx.conf_dir)), bus);
        write_fragment(&fx.root.join("bad"), "topics: {}\n");

        assert!(!rec.reconcile(walk(&fx.root)).await.unwrap());
        assert!(!rec.reconcile(walk(&fx.root)).await.unwrap());
        assert_eq!(rec.fragment_count().await, 1);

        let kinds = drain(&mut rx);
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::FragmentInvalid).count(), 1);
        assert!(!kinds.contains(&EventKind::ReloadRequested));
    }

    #[tokio::test]
    async fn test_uncompilable_fragment_is_skipped() {
        let fx = fixture();
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let rec = Reconciler::new(&fx.cfg, Box::new(FakeWorker::new(&fx.conf_dir)), bus);
        let good = write_fragment(&fx.root.join("good"), VALID);
        let bad = write_fragment(
            &fx.root.join("other"),
            "topics:\n  app: {topic: t, type: kafkalog, broker: elsewhere}\n",
        );

        assert!(rec.reconcile(walk(&fx.root)).await.unwrap());
        let names = listing(&fx.conf_dir);
        assert!(names.contains(&file_name(&good)));
        assert!(!names.contains(&file_name(&bad)));

        let kinds = drain(&mut rx);
        assert!(kinds.contains(&EventKind::FragmentSkipped));
        assert!(kinds.contains(&EventKind::ReloadCompleted));
    }

    #[tokio::test]
    async fn test_failed_worker_reload_is_fatal() {
        let fx = fixture();
        let mut worker = FakeWorker::new(&fx.conf_dir);
        worker.fail_start = true;
        let rec = Reconciler::new(&fx.cfg, Box::new(worker), Bus::default());

        let err = rec.reload("test").await.unwrap_err();
        assert!(matches!(err, ReloadError::RestartFailed));
    }

    #[tokio::test]
    async fn test_check_detects_dead_worker() {
        let fx = fixture();
        let worker = FakeWorker::new(&fx.conf_dir);
        let alive = worker.alive.clone();
        let rec = Reconciler::new(&fx.cfg, Box::new(worker), Bus::default());

        rec.check().await.unwrap();
        rec.start_worker().await.unwrap();
        rec.check().await.unwrap();
        assert!(rec.probe().await);

        *alive.lock().unwrap() = false;
        assert!(matches!(rec.check().await, Err(ReloadError::WorkerDied)));

        rec.stop_worker().await;
        rec.check().await.unwrap();
        assert_eq!(rec.worker_state().await, WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_reload_after_stop_keeps_worker_down() {
        let fx = fixture();
        let bus = Bus::default();
        let worker = FakeWorker::new(&fx.conf_dir);
        let alive = worker.alive.clone();
        let snapshots = worker.snapshots.clone();
        let rec = Reconciler::new(&fx.cfg, Box::new(worker), bus.clone());

        rec.start_worker().await.unwrap();
        rec.stop_worker().await;
        let mut rx = bus.subscribe();

        write_fragment(&fx.root.join("late"), VALID);
        assert!(rec.reconcile(walk(&fx.root)).await.unwrap());
        rec.reload("SIGUSR1").await.unwrap();

        assert!(!*alive.lock().unwrap(), "worker came back after a shutdown stop");
        assert!(snapshots.lock().unwrap().is_empty());
        assert_eq!(rec.fragment_count().await, 1);
        assert!(!drain(&mut rx).contains(&EventKind::ReloadRequested));
        rec.check().await.unwrap();

        // an explicit start lifts the stop
        rec.start_worker().await.unwrap();
        rec.reload("SIGUSR1").await.unwrap();
        assert_eq!(snapshots.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reloads_never_interleave() {
        let fx = fixture();
        for name in ["a", "b", "c"] {
            write_fragment(&fx.root.join(name), VALID);
        }
        let mut worker = FakeWorker::new(&fx.conf_dir);
        worker.delay = Duration::from_millis(50);
        let snapshots = worker.snapshots.clone();
        let rec = Arc::new(Reconciler::new(&fx.cfg, Box::new(worker), Bus::default()));

        // populate the registry (one reload)
        assert!(rec.reconcile(walk(&fx.root)).await.unwrap());
        let complete = listing(&fx.conf_dir);
        assert_eq!(complete.len(), 4);

        let mut handles = Vec::new();
        for i in 0..4 {
            let rec = Arc::clone(&rec);
            handles.push(tokio::spawn(async move {
                rec.reload(&format!("signal {i}")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 5);
        assert!(snapshots.iter().all(|s| *s == complete));
    }
}
