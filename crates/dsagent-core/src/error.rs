//! Agent errors.

use thiserror::Error;

use dsagent_checkpoint::StoreError;
use dsagent_config::ConfigError;
use dsagent_protocols::{AgentState, DriverError, EventKind};
use dsagent_recovery::RecoveryError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The current state has no handler for the event.
    #[error("Event {event} not handled in state {state}")]
    UnhandledEvent { state: AgentState, event: EventKind },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    /// The control loop is gone; the agent has shut down.
    #[error("Agent control loop has stopped")]
    ChannelClosed,

    /// A restore step left the agent somewhere other than expected.
    #[error("Restoring {target}: expected {expected} after {event}, found {found}")]
    RestorationMismatch {
        target: AgentState,
        event: EventKind,
        expected: AgentState,
        found: AgentState,
    },
}
