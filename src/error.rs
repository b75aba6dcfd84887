//! Error types used by the feedvisor runtime and its components.
//!
//! Errors are split by concern:
//!
//! - [`ConfigError`] static configuration could not be loaded or is invalid.
//! - [`FragmentError`] a discovered fragment file could not be read or parsed.
//! - [`CompileError`] a parsed topic could not be rendered into worker configuration.
//! - [`ReloadError`] the reload orchestration or the supervised worker failed.
//! - [`TaskError`] a long-lived loop ended abnormally.
//! - [`RuntimeError`] the daemon itself failed to start or to stop cleanly.
//!
//! Every enum provides `as_label` (a short stable snake_case label for logs).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced while loading the static configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`Config`](crate::Config).
    #[error("cannot parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field holds a value the daemon cannot run with.
    #[error("{field} {reason}")]
    Invalid {
        /// Dotted field name (e.g. `worker.bin_path`).
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io",
            ConfigError::Yaml(_) => "config_yaml",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// # Errors produced while reading and parsing a fragment file.
///
/// A fragment error never aborts a scan: the registry records the path with an empty
/// topic set and the error is reported for logging.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FragmentError {
    /// Fragment file could not be read (or its metadata could not be fetched).
    #[error("cannot read fragment: {0}")]
    Io(#[from] std::io::Error),

    /// Fragment file is not a valid YAML document.
    #[error("invalid fragment document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Fragment declares no topics.
    #[error("there is no topic in fragment")]
    NoTopics,

    /// A required topic field is absent or empty.
    #[error("topic {topic:?}: {field} can not be empty")]
    MissingField {
        /// Declared topic name.
        topic: String,
        /// Name of the empty field.
        field: &'static str,
    },

    /// Retention is neither a duration nor a bare hour count.
    #[error("topic {topic:?}: invalid retention value {value:?}")]
    InvalidRetention {
        /// Declared topic name.
        topic: String,
        /// Raw retention value.
        value: String,
    },

    /// Retention parsed but is zero or negative.
    #[error("topic {topic:?}: retention has to be positive, not {value:?}")]
    NonPositiveRetention {
        /// Declared topic name.
        topic: String,
        /// Raw retention value.
        value: String,
    },

    /// Ack is not an integer or not one of `-1`, `0`, `1`.
    #[error("topic {topic:?}: unknown ack level {value:?}")]
    UnknownAck {
        /// Declared topic name.
        topic: String,
        /// Raw ack value.
        value: String,
    },
}

impl FragmentError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            FragmentError::Io(_) => "fragment_io",
            FragmentError::Yaml(_) => "fragment_yaml",
            FragmentError::NoTopics => "fragment_no_topics",
            FragmentError::MissingField { .. } => "fragment_missing_field",
            FragmentError::InvalidRetention { .. } => "fragment_invalid_retention",
            FragmentError::NonPositiveRetention { .. } => "fragment_non_positive_retention",
            FragmentError::UnknownAck { .. } => "fragment_unknown_ack",
        }
    }
}

/// # Errors produced by the config compiler.
///
/// Validation runs in declaration order; the first failing rule wins.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Topic name, destination topic, type or broker alias is empty.
    #[error("compile topic: missing required field {field}")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// Source-format tag is not recognized.
    #[error("compile topic: unsupported type {kind:?}")]
    UnsupportedType {
        /// Raw source-format tag.
        kind: String,
    },

    /// Broker alias has no entry in the broker table.
    #[error("compile topic: unsupported broker {broker:?}")]
    UnsupportedBroker {
        /// Raw broker alias.
        broker: String,
    },

    /// Ack level is not one of `-1`, `0`, `1`.
    #[error("compile topic: unsupported ack level {ack}")]
    UnsupportedAck {
        /// Raw ack level.
        ack: i64,
    },
}

impl CompileError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use feedvisor::CompileError;
    ///
    /// let err = CompileError::UnsupportedAck { ack: 7 };
    /// assert_eq!(err.as_label(), "unsupported_ack_level");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CompileError::MissingField { .. } => "missing_required_field",
            CompileError::UnsupportedType { .. } => "unsupported_type",
            CompileError::UnsupportedBroker { .. } => "unsupported_broker",
            CompileError::UnsupportedAck { .. } => "unsupported_ack_level",
        }
    }
}

/// # Errors produced by the reload orchestration and the worker.
///
/// All variants are fatal at runtime: the caller escalates them to a global shutdown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReloadError {
    /// Config directory could not be cleared or repopulated.
    #[error("cannot prepare config dir {path:?}: {source}")]
    ConfDir {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Worker could not be started again after a reload.
    #[error("worker restart failed")]
    RestartFailed,

    /// Worker could not be started.
    #[error("worker start failed")]
    StartFailed,

    /// Worker exited while it was supposed to be running.
    #[error("worker process exited prematurely")]
    WorkerDied,
}

impl ReloadError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReloadError::ConfDir { .. } => "reload_conf_dir",
            ReloadError::RestartFailed => "reload_restart_failed",
            ReloadError::StartFailed => "worker_start_failed",
            ReloadError::WorkerDied => "worker_died",
        }
    }

    pub(crate) fn conf_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReloadError::ConfDir {
            path: path.into(),
            source,
        }
    }
}

/// # Errors produced by long-lived loops.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Unrecoverable error: the runtime shuts the whole daemon down.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
        }
    }
}

impl From<ReloadError> for TaskError {
    fn from(err: ReloadError) -> Self {
        TaskError::Fatal {
            error: err.to_string(),
        }
    }
}

/// # Errors produced by the daemon runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A startup step failed; nothing was left running.
    #[error("startup failed at {stage}: {error}")]
    Startup {
        /// Name of the failing step.
        stage: &'static str,
        /// The underlying error message.
        error: String,
    },

    /// A loop failed fatally and brought the daemon down.
    #[error("daemon stopped after fatal error: {error}")]
    Fatal {
        /// The first fatal error observed.
        error: String,
    },

    /// Shutdown grace period was exceeded; some loops did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the loops that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use feedvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Startup { .. } => "runtime_startup",
            RuntimeError::Fatal { .. } => "runtime_fatal",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    pub(crate) fn startup(stage: &'static str, error: impl ToString) -> Self {
        RuntimeError::Startup {
            stage,
            error: error.to_string(),
        }
    }
}
