//! # Run one long-lived loop to completion.
//!
//! ## Event flow
//! ```text
//! publish LoopStarting
//! task.run(child token)
//!   ├─ Ok(())        → publish LoopStopped
//!   └─ Err(Fatal)    → publish LoopFailed
//!                    → publish ShutdownRequested{reason}
//!                    → runtime token.cancel()
//! ```
//!
//! ## Rules
//! - always publishes **exactly one** terminal event: `LoopStopped` or `LoopFailed`
//! - a fatal loop error stops every loop, not just the failing one
//! - each loop runs on a **child token**; cancelling it does not affect the parent

use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::Task,
};

/// Runs `task` until it returns, publishing lifecycle events to `bus`.
///
/// A fatal error is escalated by cancelling `runtime` and is returned to the caller.
pub async fn run_loop<T: Task + ?Sized>(
    task: &T,
    runtime: &CancellationToken,
    bus: &Bus,
) -> Result<(), TaskError> {
    bus.publish(Event::new(EventKind::LoopStarting).with_task(task.name()));

    match task.run(runtime.child_token()).await {
        Ok(()) => {
            bus.publish(Event::new(EventKind::LoopStopped).with_task(task.name()));
            Ok(())
        }
        Err(err) => {
            bus.publish(
                Event::new(EventKind::LoopFailed)
                    .with_task(task.name())
                    .with_reason(err.to_string()),
            );
            if !runtime.is_cancelled() {
                bus.publish(
                    Event::new(EventKind::ShutdownRequested)
                        .with_task(task.name())
                        .with_reason(err.to_string()),
                );
                runtime.cancel();
            }
            Err(err)
        }
    }
}
