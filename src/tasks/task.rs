//! # Long-lived loop abstraction.
//!
//! Every loop the daemon runs (scan loop, worker loop, signal dispatcher, cleaner)
//! implements [`Task`]. A loop receives a [`CancellationToken`] and must return
//! promptly once it is cancelled.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Asynchronous, cancelable loop.
///
/// Returning `Ok(())` means a clean exit (normally after cancellation). Returning
/// [`TaskError::Fatal`] brings the whole daemon down.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use feedvisor::{Task, TaskError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         loop {
///             tokio::select! {
///                 _ = ctx.cancelled() => return Ok(()),
///                 _ = tokio::time::sleep(Duration::from_secs(1)) => {}
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable loop name.
    fn name(&self) -> &str;

    /// Runs the loop until cancellation or a fatal error.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
