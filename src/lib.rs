//! # feedvisor
//!
//! **Feedvisor** is a reconciliation daemon for a log-shipping worker.
//!
//! It discovers `kafkafeeder.yaml` fragments scattered across a directory tree,
//! compiles each of them into the worker's native configuration, keeps the worker's
//! config directory in sync with what is on disk and supervises the worker process.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   log_dir/**/kafkafeeder.yaml            OS signals
//!            │                        (INT/TERM/QUIT, USR1, CHLD, USR2)
//!            ▼                                  │
//!   ┌────────────────┐                 ┌────────┴─────────┐
//!   │    ScanLoop    │                 │ SignalDispatcher │
//!   │ walk + resolve │                 └────────┬─────────┘
//!   └───────┬────────┘                          │
//!           │ Vec<Discovery>                    │ reload / check / probe
//!           ▼                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Reconciler (one async mutex)                                     │
//! │  - FragmentRegistry  (path → fragment, mtime change detection)    │
//! │  - Compiler          (fragment → worker config text)              │
//! │  - Worker            (start / stop / reload / health / probe)     │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼
//!                 conf_dir/hekad.toml + conf_dir/<ident>.toml
//!                                 │
//!                                 ▼
//!                      <bin_path> -config <conf_dir>
//! ```
//!
//! Every component publishes [`Event`]s on the [`Bus`]; the [`Daemon`] forwards them
//! to a [`SubscriberSet`], where [`LogWriter`] renders them as `tracing` records.
//!
//! ### Lifecycle
//! ```text
//! Daemon::run()
//!   ├─► restore checkpoints ─► reset conf_dir ─► register signals   (fatal on error)
//!   ├─► spawn loops: worker, signals, watcher, cleaner
//!   ├─► wait for the runtime token (signal, fatal loop error, shutdown_token())
//!   └─► join loops within `grace` ─► AllStoppedWithin | GraceExceeded
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                               |
//! |-------------------|----------------------------------------------------------|-----------------------------------------|
//! | **Fragments**     | Parse and track fragment files.                          | [`fragments::FragmentRegistry`]         |
//! | **Compiler**      | Render fragments into worker configuration.              | [`Compiler`]                            |
//! | **Worker**        | Supervise the external process.                          | [`Worker`], [`WorkerProcess`]           |
//! | **Runtime**       | Startup, loops, signals, graceful shutdown.              | [`Daemon`], [`Reconciler`]              |
//! | **Subscriber API**| Hook into runtime events.                                | [`Subscribe`], [`LogWriter`]            |
//! | **Errors**        | Typed errors per concern.                                | [`RuntimeError`], [`ReloadError`]       |
//! | **Configuration** | Static YAML configuration.                               | [`Config`]                              |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use feedvisor::{Config, Daemon, LogWriter, Subscribe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::from_file("/etc/feedvisor.yaml")?;
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     Daemon::builder(cfg).with_subscribers(subs).build().run().await?;
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod fragments;
pub mod scan;
pub mod subscribers;

mod config;
mod core;
mod error;
mod events;
mod policies;
mod tasks;
mod worker;

// ---- Public re-exports ----

pub use compiler::Compiler;
pub use config::{Config, LoggingConfig, LoopConfig, WorkerConfig};
pub use core::{Daemon, DaemonBuilder, MAIN_CONF_LINK, Reconciler};
pub use error::{CompileError, ConfigError, FragmentError, ReloadError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::ReloadPolicy;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskRef};
pub use worker::{Worker, WorkerProcess, WorkerState};
