//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers into the
//! daemon. Each subscriber is driven by a dedicated worker loop fed by a bounded
//! queue owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   publisher nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
///
/// # Example
/// ```
/// use feedvisor::subscribers::Subscribe;
/// use feedvisor::{Event, EventKind};
///
/// struct Reloads;
///
/// #[async_trait::async_trait]
/// impl Subscribe for Reloads {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::ReloadCompleted {
///             // notify someone
///         }
///     }
///     fn name(&self) -> &'static str { "reloads" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
