//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod schema_driver;
mod schema_infra;

pub use schema_driver::*;
pub use schema_infra::*;

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// Key under which the driver memento is stored, both in the state store and
/// inside `agent.prior_state`.
pub const MEMENTO_KEY: &str = "dsa_state";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub driver: DriverConfig,

    /// Output streams, keyed by stream name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_config: Option<HashMap<String, StreamConfig>>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent identity and carried-over state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Resource id; the origin of every published notification.
    #[serde(default = "default_resource_id")]
    pub resource_id: String,

    /// State handed over from a prior agent process.
    ///
    /// Must be a table when present. Only the `dsa_state` entry is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<serde_json::Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            resource_id: default_resource_id(),
            prior_state: None,
        }
    }
}

fn default_resource_id() -> String {
    "dataset_agent".to_string()
}
