//! # Config compiler: fragment → worker configuration text.
//!
//! Every topic of a fragment becomes one self-contained unit of five blocks, all named
//! after the topic identifier (see [`topic_ident`]):
//!
//! ```text
//! [KafkaOutput_<id>]       brokers, topic, acks, retry and buffering policy
//! [Decoder_<id>]           per-format decoder tagging messages with <id>
//! [Encoder_<id>]           payload encoder
//! [Splitter_<id>]          per-format record splitter
//! [LogstreamerInput_<id>]  log directory, file pattern, rotation ordering
//! ```
//!
//! The output sink matches messages whose `Type` is `<id>`, which the decoder sets,
//! so units compiled together never cross-route.
//!
//! ## Rules
//! - compilation is pure: the same inputs always give byte-identical text;
//! - topics are compiled in name order;
//! - the first failing topic aborts the whole fragment.

mod ident;

use std::collections::BTreeMap;
use std::path::Path;

pub use ident::{PLACEHOLDER, file_name, ident, topic_ident};

use crate::error::CompileError;
use crate::fragments::{AckLevel, Fragment, SourceFormat, Topic};

/// Renders topics using a static broker table.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    /// Broker alias → pre-rendered address list literal.
    brokers: BTreeMap<String, String>,
}

/// Format-specific parts of a unit.
struct FormatBlocks {
    decoder: String,
    splitter: &'static str,
    file_match: String,
    priority: &'static str,
}

impl Compiler {
    /// Creates a compiler for the given broker alias → address list table.
    pub fn new(brokers: &BTreeMap<String, Vec<String>>) -> Self {
        let brokers = brokers
            .iter()
            .map(|(alias, addrs)| (alias.clone(), format!("[\"{}\"]", addrs.join("\",\""))))
            .collect();
        Self { brokers }
    }

    /// Compiles every topic of `fragment` into one document.
    pub fn compile(&self, fragment: &Fragment) -> Result<String, CompileError> {
        let mut out = String::new();
        for (name, topic) in &fragment.topics {
            out.push_str(&self.compile_topic(name, &fragment.directory, topic)?);
        }
        Ok(out)
    }

    /// Compiles one topic declared as `name` in a fragment owned by `directory`.
    pub fn compile_topic(
        &self,
        name: &str,
        directory: &Path,
        topic: &Topic,
    ) -> Result<String, CompileError> {
        for (field, value) in [
            ("name", name),
            ("topic", topic.topic.as_str()),
            ("type", topic.kind.as_str()),
            ("broker", topic.broker.as_str()),
        ] {
            if value.is_empty() {
                return Err(CompileError::MissingField { field });
            }
        }
        let format =
            SourceFormat::from_tag(&topic.kind).ok_or_else(|| CompileError::UnsupportedType {
                kind: topic.kind.clone(),
            })?;
        let addrs =
            self.brokers
                .get(&topic.broker)
                .ok_or_else(|| CompileError::UnsupportedBroker {
                    broker: topic.broker.clone(),
                })?;
        let acks = AckLevel::from_level(topic.ack)
            .ok_or(CompileError::UnsupportedAck { ack: topic.ack })?
            .as_required_acks();

        let id = topic_ident(directory, name);
        let blocks = format_blocks(format, &id, name);
        let dir = directory.to_string_lossy();
        let dest = &topic.topic;

        Ok(format!(
            r#"
[KafkaOutput_{id}]
type = "KafkaOutput"
message_matcher = "Type == '{id}'"
encoder = "Encoder_{id}"
addrs = {addrs}
partitioner = "Hash"
hash_variable = "Fields[key]"
topic = "{dest}"
required_acks = "{acks}"
on_error = "Retry"
error_tries = 0
error_timeout = 10000
create_checkpoints = true
checkpoint_interval = 60
max_buffered_bytes = 102400
max_buffer_time = 15000

[Decoder_{id}]
{decoder}

[Encoder_{id}]
type = "PayloadEncoder"
append_newlines = false

[Splitter_{id}]
{splitter}

[LogstreamerInput_{id}]
type = "LogstreamerInput"
splitter = "Splitter_{id}"
decoder = "Decoder_{id}"
log_directory = "{dir}"
file_match = '{file_match}'
priority = {priority}
"#,
            decoder = blocks.decoder,
            splitter = blocks.splitter,
            file_match = blocks.file_match,
            priority = blocks.priority,
        ))
    }
}

fn format_blocks(format: SourceFormat, id: &str, name: &str) -> FormatBlocks {
    match format {
        SourceFormat::Kafkalog => FormatBlocks {
            decoder: format!("type = \"KafkalogDecoder\"\nmsg_type = \"{id}\""),
            splitter: "type = \"KafkalogSplitter\"",
            file_match: format!(r"(?P<Date>\d+)_(?P<Time>\d+)_\d+_UTC-{name}\.szn"),
            priority: r#"["Date", "Time"]"#,
        },
    }
}
