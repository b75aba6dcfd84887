//! # Configuration fragments: model, parser and change-tracking registry.
//!
//! A fragment is a `kafkafeeder.yaml` file dropped into an application's log
//! directory. It declares which log streams of that directory are shipped where.
//!
//! ## Contents
//! - [`Fragment`], [`Topic`], [`AckLevel`], [`SourceFormat`] data model
//! - [`parse`], [`parse_file`], [`parse_retention`] YAML document → topics
//! - [`FragmentRegistry`] path → fragment map with modification-time change detection
//!
//! ## Lifecycle
//! ```text
//! discovered ──► registry.add() ──► parsed  (changed = true)
//!                     │        └──► invalid (tracked with no topics, error reported)
//!                     └── same or older mtime ──► ignored (changed = false)
//! file removed ──► registry.keep_valid() ──► evicted (changed = true)
//! ```

mod model;
mod parse;
mod registry;

pub use model::{AckLevel, FRAGMENT_FILE_NAME, Fragment, SourceFormat, Topic};
pub use parse::{parse, parse_file, parse_retention};
pub use registry::FragmentRegistry;
