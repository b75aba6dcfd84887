//! # Worker process on top of `tokio::process`.
//!
//! Invocation is `<bin> -config <conf_dir>`. Both output streams are piped and
//! drained by relay tasks for the whole life of the child.
//!
//! ## Rules
//! - stop sends `SIGTERM`; if that cannot be delivered the child is killed;
//! - stop always waits for the exit, wait errors are logged and swallowed;
//! - the child is spawned with `kill_on_drop`, so dropping the handle never leaves
//!   an orphan;
//! - a reaped child reports unhealthy only while it is intended to run.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use super::relay::{Stream, relay};
use super::{Worker, WorkerState};
use crate::config::WorkerConfig;
use crate::events::{Bus, Event, EventKind};
use crate::policies::ReloadPolicy;

/// The real supervised worker process.
pub struct WorkerProcess {
    bin: PathBuf,
    conf_dir: PathBuf,
    policy: ReloadPolicy,
    bus: Bus,

    child: Option<Child>,
    state: WorkerState,
    should_run: bool,
}

impl WorkerProcess {
    /// Creates a stopped worker.
    pub fn new(
        bin: impl Into<PathBuf>,
        conf_dir: impl Into<PathBuf>,
        policy: ReloadPolicy,
        bus: Bus,
    ) -> Self {
        Self {
            bin: bin.into(),
            conf_dir: conf_dir.into(),
            policy,
            bus,
            child: None,
            state: WorkerState::Stopped,
            should_run: false,
        }
    }

    /// Creates a stopped worker from the `worker` config section.
    pub fn from_config(cfg: &WorkerConfig, bus: Bus) -> Self {
        Self::new(&cfg.bin_path, &cfg.conf_dir, cfg.reload, bus)
    }

    /// Returns true if the worker is intended to be running.
    pub fn should_run(&self) -> bool {
        self.should_run
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-config")
            .arg(&self.conf_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn send(&self, sig: Signal) -> nix::Result<u32> {
        let pid = self.pid().ok_or(nix::errno::Errno::ESRCH)?;
        let raw = i32::try_from(pid).map_err(|_| nix::errno::Errno::EINVAL)?;
        signal::kill(Pid::from_raw(raw), sig)?;
        Ok(pid)
    }
}

#[async_trait]
impl Worker for WorkerProcess {
    async fn start(&mut self) -> bool {
        self.should_run = true;
        self.state = WorkerState::Starting;

        match self.command().spawn() {
            Ok(mut child) => {
                if let Some(out) = child.stdout.take() {
                    tokio::spawn(relay(out, Stream::Stdout));
                }
                if let Some(err) = child.stderr.take() {
                    tokio::spawn(relay(err, Stream::Stderr));
                }
                let pid = child.id();
                self.child = Some(child);
                self.state = WorkerState::Running;
                info!(pid, bin = %self.bin.display(), "worker started");
                self.bus
                    .publish(Event::new(EventKind::WorkerStarted).with_pid(pid));
                true
            }
            Err(err) => {
                self.state = WorkerState::Failed;
                error!(bin = %self.bin.display(), error = %err, "cannot start worker");
                self.bus.publish(
                    Event::new(EventKind::WorkerStartFailed).with_reason(err.to_string()),
                );
                false
            }
        }
    }

    async fn stop(&mut self) {
        self.should_run = false;
        if self.child.is_none() {
            self.state = WorkerState::Stopped;
            return;
        }
        self.state = WorkerState::Stopping;

        let pid = self.pid();
        if let Err(errno) = self.send(Signal::SIGTERM) {
            warn!(pid, error = %errno, "cannot deliver SIGTERM, killing worker");
            if let Some(child) = self.child.as_mut() {
                if let Err(err) = child.start_kill() {
                    debug!(pid, error = %err, "kill not delivered");
                }
            }
        }

        if let Some(mut child) = self.child.take() {
            match child.wait().await {
                Ok(status) => {
                    info!(pid, %status, "worker stopped");
                    self.bus.publish(
                        Event::new(EventKind::WorkerStopped)
                            .with_pid(pid)
                            .with_reason(status.to_string()),
                    );
                }
                Err(err) => error!(pid, error = %err, "error waiting for worker exit"),
            }
        }
        self.state = WorkerState::Stopped;
    }

    async fn reload(&mut self) -> bool {
        match self.policy {
            ReloadPolicy::Restart => {
                self.stop().await;
                let ok = self.start().await;
                if ok {
                    info!("worker reloaded");
                } else {
                    error!("worker restart failed");
                }
                ok
            }
            ReloadPolicy::Signal => match self.send(Signal::SIGHUP) {
                Ok(pid) => {
                    info!(pid, "reload signal sent to worker");
                    self.bus
                        .publish(Event::new(EventKind::WorkerSignaled).with_pid(Some(pid)));
                    true
                }
                Err(errno) => {
                    warn!(error = %errno, "cannot signal worker, restarting it");
                    self.stop().await;
                    self.start().await
                }
            },
        }
    }

    fn is_healthy(&mut self) -> bool {
        if !self.should_run {
            return true;
        }
        let alive = match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if !alive {
            self.state = WorkerState::Failed;
        }
        alive
    }

    fn probe(&self) -> bool {
        match self.send(Signal::SIGUSR1) {
            Ok(pid) => {
                info!(pid, "status signal sent to worker");
                self.bus
                    .publish(Event::new(EventKind::WorkerProbed).with_pid(Some(pid)));
                true
            }
            Err(errno) => {
                error!(error = %errno, "cannot send status signal to worker");
                self.bus.publish(
                    Event::new(EventKind::WorkerProbeFailed).with_reason(errno.to_string()),
                );
                false
            }
        }
    }

    fn state(&self) -> WorkerState {
        self.state
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}
