//! Infrastructure configuration types (retry, persistence, logging).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Reconnect backoff configuration.
///
/// Sleep times follow `base_coefficient * n!` seconds, capped at
/// `max_interval_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Multiplier, in seconds.
    #[serde(default = "default_base_coefficient")]
    pub base_coefficient: f64,

    /// How far past the expected interval a retry may come before the
    /// sequence is considered stale and restarts.
    #[serde(default = "default_tolerance_coefficient")]
    pub tolerance_coefficient: f64,

    /// Ceiling for a single sleep, in seconds.
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: f64,
}

fn default_base_coefficient() -> f64 {
    60.0
}

fn default_tolerance_coefficient() -> f64 {
    1.5
}

fn default_max_interval() -> f64 {
    3600.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_coefficient: default_base_coefficient(),
            tolerance_coefficient: default_tolerance_coefficient(),
            max_interval_secs: default_max_interval(),
        }
    }
}

impl RetryConfig {
    pub fn new(base_coefficient: f64, tolerance_coefficient: f64, max_interval_secs: f64) -> Self {
        Self {
            base_coefficient,
            tolerance_coefficient,
            max_interval_secs,
        }
    }

    /// Maximum interval as a Duration, or `None` if it is not representable.
    pub fn max_interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.max_interval_secs).ok()
    }
}

/// State store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Directory holding per-agent state files.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("dsagent").join("state"))
        .unwrap_or_else(|| PathBuf::from("/tmp/dsagent/state"))
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_state_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files. No file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Emit JSON lines on the console instead of text.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            json: false,
        }
    }
}
