//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every component that
//! changes state (scan loop, reconciler, worker, runtime) publishes on it; the runtime
//! forwards everything to the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscriber (one):
//!   ScanLoop    ──┐
//!   Reconciler  ──┼──────► Bus ───────► Daemon listener ────► SubscriberSet
//!   Worker      ──┤  (broadcast chan)
//!   Runner      ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; it is safe from blocking threads too.
//! - A single ring buffer stores recent events for all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - Events published while nobody is subscribed are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::LoopStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LoopStopped));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LoopStopped);
    }

    #[tokio::test]
    async fn test_lagging_receiver_is_told_how_much_it_missed() {
        let bus = Bus::new(1);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LoopStarting));
        bus.publish(Event::new(EventKind::LoopStopped));

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert_eq!(n, 1),
            other => panic!("expected lag, got {other:?}"),
        }
    }
}
