//! Loop owning the worker's run-and-wait lifetime.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::Reconciler;
use crate::error::TaskError;
use crate::tasks::Task;

/// Starts the worker, waits for shutdown, stops the worker.
///
/// A worker that cannot be started at all is fatal.
pub struct WorkerLoop {
    reconciler: Arc<Reconciler>,
}

impl WorkerLoop {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl Task for WorkerLoop {
    fn name(&self) -> &str {
        "worker"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        self.reconciler.start_worker().await?;
        ctx.cancelled().await;
        info!("shutdown accepted, stopping worker");
        self.reconciler.stop_worker().await;
        Ok(())
    }
}
