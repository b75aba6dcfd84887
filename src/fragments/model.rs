//! Fragment data model.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// File name the scanner looks for.
pub const FRAGMENT_FILE_NAME: &str = "kafkafeeder.yaml";

/// Acknowledgment level requested from the brokers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AckLevel {
    /// `0`: fire and forget.
    Disabled,
    /// `1`: acknowledged once the leader has the message in memory.
    Memory,
    /// `-1`: acknowledged once all in-sync replicas wrote the message (default).
    #[default]
    Disk,
}

impl AckLevel {
    /// Maps a numeric level (`-1`, `0`, `1`) to an [`AckLevel`].
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            -1 => Some(AckLevel::Disk),
            0 => Some(AckLevel::Disabled),
            1 => Some(AckLevel::Memory),
            _ => None,
        }
    }

    /// Returns the numeric level.
    pub fn level(self) -> i64 {
        match self {
            AckLevel::Disk => -1,
            AckLevel::Disabled => 0,
            AckLevel::Memory => 1,
        }
    }

    /// Returns the worker's `required_acks` vocabulary word.
    pub fn as_required_acks(self) -> &'static str {
        match self {
            AckLevel::Disabled => "NoResponse",
            AckLevel::Memory => "WaitForLocal",
            AckLevel::Disk => "WaitForAll",
        }
    }
}

/// Log-line format of the shipped files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// Rotated `<date>_<time>_<seq>_UTC-<name>.szn` kafkalog journals.
    Kafkalog,
}

impl SourceFormat {
    /// Resolves a `type` tag; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "kafkalog" => Some(SourceFormat::Kafkalog),
            _ => None,
        }
    }

    /// Returns the `type` tag.
    pub fn tag(self) -> &'static str {
        match self {
            SourceFormat::Kafkalog => "kafkalog",
        }
    }
}

/// One routing rule of a fragment.
///
/// `kind`, `broker` and `ack` are kept raw: the compiler is the authority that
/// resolves them and reports unsupported values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic {
    /// Destination topic on the broker.
    pub topic: String,
    /// Source-format tag (`type` in the document).
    pub kind: String,
    /// Broker alias, resolved against the static broker table.
    pub broker: String,
    /// Explicit retention; `None` when not declared.
    pub retention: Option<Duration>,
    /// Numeric acknowledgment level.
    pub ack: i64,
}

/// One discovered fragment file.
#[derive(Clone, Debug)]
pub struct Fragment {
    /// Canonical (symlink-resolved) path; registry key.
    pub path: PathBuf,
    /// Modification time observed when the fragment was last parsed.
    pub modified: SystemTime,
    /// Absolute directory of the path the fragment was discovered through.
    pub directory: PathBuf,
    /// Topics by declared name; empty when the file failed to parse.
    pub topics: BTreeMap<String, Topic>,
}

impl Fragment {
    /// Returns true if the fragment contributes nothing to the worker config.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
