//! # Long-lived loops.
//!
//! - [`Task`]: trait every loop implements
//! - [`TaskRef`]: shared handle (`Arc<dyn Task>`) the runtime spawns

mod task;

use std::sync::Arc;

pub use task::Task;

/// Shared reference to a loop.
pub type TaskRef = Arc<dyn Task>;
