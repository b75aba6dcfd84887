//! # Log-retention cleaner.
//!
//! Runs on its own interval and exits on cancellation. Topics carry a retention
//! duration, but no deletion policy is applied yet: each tick only reports that.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::TaskError;
use crate::tasks::Task;

/// Periodic retention task.
pub struct Cleaner {
    period: Duration,
}

impl Cleaner {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

#[async_trait]
impl Task for Cleaner {
    fn name(&self) -> &str {
        "cleaner"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = ticker.tick() => info!("retention cleanup is not implemented"),
            }
        }
    }
}
