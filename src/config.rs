//! # Static daemon configuration.
//!
//! Provides [`Config`], the settings the daemon is started with. It is loaded once from
//! a YAML file and never reloaded; only the discovered fragments change at runtime.
//!
//! ```yaml
//! checkpoint_dir: /var/lib/feedvisor/checkpoints
//! journal_dir: /var/lib/feedvisor/journal
//! log_dir: /var/log/apps
//! grace: 30
//! logging: { level: info, json: false }
//! worker:
//!   main_conf_path: /etc/hekad.toml
//!   bin_path: /usr/bin/hekad
//!   conf_dir: /etc/hekad.d
//!   reload: restart
//!   brokers:
//!     kafka: ["kafka1:9092", "kafka2:9092"]
//! watcher: { interval: 10 }
//! cleaner: { interval: 3600 }
//! ```
//!
//! ## Rules
//! - intervals and `grace` are whole seconds;
//! - every directory and path field is required (empty is rejected by [`Config::validate`]);
//! - `hekad` and `kafka_brokers` are accepted as aliases of `worker` and `worker.brokers`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::policies::ReloadPolicy;

/// Global configuration of the daemon.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose files are copied into `journal_dir` at startup.
    pub checkpoint_dir: PathBuf,
    /// Worker journal directory (checkpoint restore target).
    pub journal_dir: PathBuf,
    /// Root directory scanned for fragment files.
    pub log_dir: PathBuf,
    /// Seconds to wait for all loops to stop after shutdown was requested.
    pub grace: u64,
    /// Log output settings for the binary.
    pub logging: LoggingConfig,
    /// Supervised worker settings.
    #[serde(alias = "hekad")]
    pub worker: WorkerConfig,
    /// Reconciliation loop settings.
    pub watcher: LoopConfig,
    /// Log-retention cleaner settings.
    pub cleaner: LoopConfig,
}

/// Supervised worker settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Static main worker configuration, linked into `conf_dir` on every reload.
    pub main_conf_path: PathBuf,
    /// Worker executable.
    pub bin_path: PathBuf,
    /// Active config directory; fully owned by the daemon.
    pub conf_dir: PathBuf,
    /// How the worker picks up a new configuration.
    pub reload: ReloadPolicy,
    /// Broker alias → broker address list.
    #[serde(alias = "kafka_brokers")]
    pub brokers: BTreeMap<String, Vec<String>>,
}

/// Settings of a periodic loop.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Tick interval in seconds; must be positive.
    pub interval: u64,
}

impl LoopConfig {
    /// Returns the tick interval as a [`Duration`].
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// Log output settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - empty paths (must be filled in, [`Config::validate`] rejects them)
    /// - `grace = 60s`
    /// - zero intervals (must be filled in)
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::new(),
            journal_dir: PathBuf::new(),
            log_dir: PathBuf::new(),
            grace: 60,
            logging: LoggingConfig::default(),
            worker: WorkerConfig::default(),
            watcher: LoopConfig::default(),
            cleaner: LoopConfig::default(),
        }
    }
}

impl Config {
    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Parses and validates a configuration document.
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that every required field is set and every interval is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &Path); 6] = [
            ("checkpoint_dir", &self.checkpoint_dir),
            ("journal_dir", &self.journal_dir),
            ("log_dir", &self.log_dir),
            ("worker.main_conf_path", &self.worker.main_conf_path),
            ("worker.bin_path", &self.worker.bin_path),
            ("worker.conf_dir", &self.worker.conf_dir),
        ];
        for (field, path) in required {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(field, "can not be empty"));
            }
        }
        if self.watcher.interval == 0 {
            return Err(ConfigError::invalid(
                "watcher.interval",
                "has to be a positive value in seconds",
            ));
        }
        if self.cleaner.interval == 0 {
            return Err(ConfigError::invalid(
                "cleaner.interval",
                "has to be a positive value in seconds",
            ));
        }
        Ok(())
    }

    /// Returns the shutdown grace period.
    #[inline]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
checkpoint_dir: /tmp/checkpoints
journal_dir: /tmp/journal
log_dir: /tmp/logs
logging:
  component: feeder
  dir: /tmp/feeder-logs
  interval: 60
hekad:
  main_conf_path: /etc/hekad.toml
  bin_path: /usr/bin/hekad
  conf_dir: /etc/hekad.d
  kafka_brokers:
    kafka: ["kafka1.dev:9092", "kafka2.dev:9092"]
watcher:
  interval: 10
cleaner:
  interval: 3600
"#;

    #[test]
    fn test_parses_legacy_layout_with_aliases() {
        let cfg = Config::from_yaml(FULL).unwrap();
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(cfg.worker.bin_path, PathBuf::from("/usr/bin/hekad"));
        assert_eq!(
            cfg.worker.brokers["kafka"],
            vec!["kafka1.dev:9092".to_string(), "kafka2.dev:9092".to_string()]
        );
        assert_eq!(cfg.watcher.period(), Duration::from_secs(10));
        assert_eq!(cfg.cleaner.period(), Duration::from_secs(3600));
        assert_eq!(cfg.grace_period(), Duration::from_secs(60));
        assert_eq!(cfg.worker.reload, ReloadPolicy::Restart);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_rejects_empty_paths() {
        let data = FULL.replace("bin_path: /usr/bin/hekad", "bin_path: \"\"");
        let err = Config::from_yaml(&data).unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
        assert!(err.to_string().contains("worker.bin_path"));

        let err = Config::from_yaml("watcher: {interval: 1}\ncleaner: {interval: 1}\n")
            .unwrap_err();
        assert!(err.to_string().contains("checkpoint_dir"));
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let data = FULL.replace("interval: 10", "interval: 0");
        let err = Config::from_yaml(&data).unwrap_err();
        assert!(err.to_string().contains("watcher.interval"));

        let data = FULL.replace("interval: 3600", "interval: 0");
        let err = Config::from_yaml(&data).unwrap_err();
        assert!(err.to_string().contains("cleaner.interval"));
    }

    #[test]
    fn test_negative_interval_is_a_parse_error() {
        let data = FULL.replace("interval: 10", "interval: -5");
        let err = Config::from_yaml(&data).unwrap_err();
        assert_eq!(err.as_label(), "config_yaml");
    }

    #[test]
    fn test_reload_policy_is_configurable() {
        let data = FULL.replace(
            "conf_dir: /etc/hekad.d",
            "conf_dir: /etc/hekad.d\n  reload: signal",
        );
        let cfg = Config::from_yaml(&data).unwrap();
        assert_eq!(cfg.worker.reload, ReloadPolicy::Signal);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
        assert_eq!(err.as_label(), "config_io");
    }
}
