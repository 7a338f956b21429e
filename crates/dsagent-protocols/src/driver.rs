//! Dataset driver protocol definitions.
//!
//! A driver is the pluggable piece that talks to the actual data source. The
//! agent only ever calls into it through [`DatasetDriver`], and the driver
//! only ever calls back through [`DriverCallbacks`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::state::{AgentState, DriverCommand};

/// Opaque driver checkpoint.
///
/// The agent never looks inside a memento: it stores whatever the driver
/// hands it and gives it back verbatim when the driver is rebuilt.
pub type Memento = serde_json::Value;

/// Outcome of a driver command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverResponse {
    /// State the agent should move to, if the command changes it.
    pub next_state: Option<AgentState>,
    /// Command result, passed back to the caller.
    pub result: Option<serde_json::Value>,
}

impl DriverResponse {
    /// Response that moves the agent to `state`.
    pub fn transition(state: AgentState) -> Self {
        Self {
            next_state: Some(state),
            result: None,
        }
    }

    /// Response that leaves the agent where it is.
    pub fn stay() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Core trait for dataset drivers.
#[async_trait]
pub trait DatasetDriver: Send + Sync {
    /// Start producing samples.
    async fn start_sampling(&self) -> Result<(), DriverError>;

    /// Stop producing samples.
    async fn stop_sampling(&self) -> Result<(), DriverError>;

    /// Execute a resource command.
    async fn execute(&self, command: &DriverCommand) -> Result<DriverResponse, DriverError>;

    /// Driver specific capabilities, reported alongside the agent's own.
    fn resource_capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tear the driver down.
    async fn shutdown(&self) -> Result<(), DriverError> {
        self.stop_sampling().await
    }
}

/// Callbacks a driver uses to talk back to its agent.
#[async_trait]
pub trait DriverCallbacks: Send + Sync {
    /// Publish parsed particles. Returns the number actually published.
    async fn publish(&self, particles: Vec<serde_json::Value>) -> usize;

    /// Persist the driver's checkpoint.
    async fn persist_state(&self, memento: Memento);

    /// Report a driver exception.
    async fn exception(&self, error: DriverError);
}

/// Everything needed to build a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSpec {
    /// Module path of the driver.
    pub module: String,
    /// Class (type) name inside the module.
    pub class: String,
    /// Driver package location, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egg: Option<String>,
    /// Driver startup configuration.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl DriverSpec {
    /// Registry key for this driver: `module.class`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }
}

/// Builds drivers from a spec.
pub trait DriverFactory: Send + Sync {
    fn create_driver(
        &self,
        spec: &DriverSpec,
        memento: Option<Memento>,
        callbacks: Arc<dyn DriverCallbacks>,
    ) -> Result<Arc<dyn DatasetDriver>, DriverError>;
}
