//! Driver and stream configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Driver plugin configuration.
///
/// Every field is optional at parse time; required keys are checked by the
/// validator so that all missing keys are reported together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Driver module path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvr_mod: Option<String>,

    /// Driver class name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvr_cls: Option<String>,

    /// Driver package URI. Recorded, never fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvr_egg: Option<String>,

    /// Configuration handed to the driver constructor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_config: Option<serde_json::Value>,

    /// Maximum records per published batch.
    #[serde(default = "default_max_records")]
    pub max_records: i64,
}

fn default_max_records() -> i64 {
    100
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            dvr_mod: None,
            dvr_cls: None,
            dvr_egg: None,
            startup_config: None,
            max_records: default_max_records(),
        }
    }
}

impl DriverConfig {
    /// Split `dvr_egg` into `(egg_name, egg_repo)`.
    ///
    /// HTTP URIs yield the last path segment and the repository prefix; any
    /// other value is taken as a bare egg name with no repository.
    pub fn egg_location(&self) -> Option<(String, Option<String>)> {
        let uri = self.dvr_egg.as_deref()?;
        if uri.starts_with("http") {
            let name = uri.rsplit('/').next().unwrap_or(uri);
            let repo_len = uri.len().saturating_sub(name.len() + 1);
            Some((name.to_string(), Some(uri[..repo_len].to_string())))
        } else {
            Some((uri.to_string(), None))
        }
    }
}

/// A single output stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,

    /// Anything else the stream definition carries.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
