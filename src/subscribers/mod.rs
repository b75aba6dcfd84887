//! # Event subscribers.
//!
//! Every state transition of the daemon is published as an [`Event`](crate::Event)
//! on the [`Bus`](crate::Bus). The runtime forwards the stream into a
//! [`SubscriberSet`], which hands each event to every [`Subscribe`] implementation
//! through its own bounded queue.
//!
//! ```text
//! Bus ──► Daemon listener ──► SubscriberSet::emit(&Event)
//!                                  ├──► LogWriter   (tracing records)
//!                                  └──► custom subscribers
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
