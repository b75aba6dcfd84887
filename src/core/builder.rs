use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::alive::AliveTracker;
use super::daemon::Daemon;
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    worker::Worker,
};

/// Builder for constructing a [`Daemon`].
pub struct DaemonBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    worker: Option<Box<dyn Worker>>,
    bus_capacity: usize,
}

impl DaemonBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            worker: None,
            bus_capacity: 1024,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every runtime event through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the worker process built from `cfg.worker`.
    pub fn with_worker(mut self, worker: Box<dyn Worker>) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Sets the event bus ring buffer size (minimum 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the daemon. Must be called inside a tokio runtime (subscriber
    /// workers are spawned here).
    pub fn build(self) -> Daemon {
        let bus = Bus::new(self.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        Daemon {
            cfg: self.cfg,
            bus,
            subs,
            alive: Arc::new(AliveTracker::new()),
            runtime_token: CancellationToken::new(),
            worker: self.worker,
        }
    }
}

impl Daemon {
    /// Returns a builder for a daemon running `cfg`.
    pub fn builder(cfg: Config) -> DaemonBuilder {
        DaemonBuilder::new(cfg)
    }
}
