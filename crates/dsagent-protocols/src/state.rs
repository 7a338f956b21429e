//! Agent states, events and driver commands.
//!
//! These are the names the agent state machine is written in. States and
//! events are plain enums; the transition table that connects them lives in
//! `dsagent-core`.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

/// Operating state of a dataset agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// No driver, nothing configured.
    Uninitialized,
    /// Driver created but not active.
    Inactive,
    /// Driver active, not yet commanded.
    Idle,
    /// Ready to accept resource commands.
    Command,
    /// Producing data.
    Streaming,
    /// Paused from command.
    Paused,
    Test,
    Calibrate,
    DirectAccess,
    Busy,
    /// Driver discovery could not determine the resource state.
    ActiveUnknown,
    /// A driver fault was trapped; reconnection is in progress.
    LostConnection,
}

impl AgentState {
    /// All states, in declaration order.
    pub const ALL: [AgentState; 12] = [
        AgentState::Uninitialized,
        AgentState::Inactive,
        AgentState::Idle,
        AgentState::Command,
        AgentState::Streaming,
        AgentState::Paused,
        AgentState::Test,
        AgentState::Calibrate,
        AgentState::DirectAccess,
        AgentState::Busy,
        AgentState::ActiveUnknown,
        AgentState::LostConnection,
    ];

    /// Stable string name, as persisted and published.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Uninitialized => "UNINITIALIZED",
            AgentState::Inactive => "INACTIVE",
            AgentState::Idle => "IDLE",
            AgentState::Command => "COMMAND",
            AgentState::Streaming => "STREAMING",
            AgentState::Paused => "PAUSED",
            AgentState::Test => "TEST",
            AgentState::Calibrate => "CALIBRATE",
            AgentState::DirectAccess => "DIRECT_ACCESS",
            AgentState::Busy => "BUSY",
            AgentState::ActiveUnknown => "ACTIVE_UNKNOWN",
            AgentState::LostConnection => "LOST_CONNECTION",
        }
    }

    /// Parse a persisted state name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// States in which the driver is producing (or about to produce) data.
    ///
    /// A fault from one of these is recovered by re-issuing the resume
    /// command; faults from any other state just return to that state.
    pub fn is_data_producing(&self) -> bool {
        matches!(self, AgentState::Streaming | AgentState::Command)
    }

    /// Sub-states reachable only from command that restore back to command.
    pub fn is_command_substate(&self) -> bool {
        matches!(
            self,
            AgentState::Test | AgentState::Calibrate | AgentState::DirectAccess | AgentState::Busy
        )
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command understood by a dataset driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCommand {
    /// Determine which state the resource is in.
    Discover,
    /// Begin (or resume) sampling.
    StartAutosample,
    /// Stop sampling.
    StopAutosample,
    /// Driver specific command, passed through untouched.
    Other(String),
}

impl std::fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverCommand::Discover => write!(f, "DRIVER_EVENT_DISCOVER"),
            DriverCommand::StartAutosample => write!(f, "DRIVER_EVENT_START_AUTOSAMPLE"),
            DriverCommand::StopAutosample => write!(f, "DRIVER_EVENT_STOP_AUTOSAMPLE"),
            DriverCommand::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Event submitted to the agent state machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentEvent {
    Initialize,
    Reset,
    GoActive,
    GoInactive,
    Run,
    Clear,
    Pause,
    Resume,
    GoCommand,
    /// Forward a command to the driver.
    ExecuteResource(DriverCommand),
    GetResourceCapabilities,
    /// The driver reported an exception.
    LostConnection,
    /// Reconnect attempt fired by the reconnect supervisor.
    Autoreconnect,
}

/// Discriminant of an [`AgentEvent`], used as the transition table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Initialize,
    Reset,
    GoActive,
    GoInactive,
    Run,
    Clear,
    Pause,
    Resume,
    GoCommand,
    ExecuteResource,
    GetResourceCapabilities,
    LostConnection,
    Autoreconnect,
}

impl AgentEvent {
    /// Table key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            AgentEvent::Initialize => EventKind::Initialize,
            AgentEvent::Reset => EventKind::Reset,
            AgentEvent::GoActive => EventKind::GoActive,
            AgentEvent::GoInactive => EventKind::GoInactive,
            AgentEvent::Run => EventKind::Run,
            AgentEvent::Clear => EventKind::Clear,
            AgentEvent::Pause => EventKind::Pause,
            AgentEvent::Resume => EventKind::Resume,
            AgentEvent::GoCommand => EventKind::GoCommand,
            AgentEvent::ExecuteResource(_) => EventKind::ExecuteResource,
            AgentEvent::GetResourceCapabilities => EventKind::GetResourceCapabilities,
            AgentEvent::LostConnection => EventKind::LostConnection,
            AgentEvent::Autoreconnect => EventKind::Autoreconnect,
        }
    }
}

impl EventKind {
    /// Stable string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Initialize => "RESOURCE_AGENT_EVENT_INITIALIZE",
            EventKind::Reset => "RESOURCE_AGENT_EVENT_RESET",
            EventKind::GoActive => "RESOURCE_AGENT_EVENT_GO_ACTIVE",
            EventKind::GoInactive => "RESOURCE_AGENT_EVENT_GO_INACTIVE",
            EventKind::Run => "RESOURCE_AGENT_EVENT_RUN",
            EventKind::Clear => "RESOURCE_AGENT_EVENT_CLEAR",
            EventKind::Pause => "RESOURCE_AGENT_EVENT_PAUSE",
            EventKind::Resume => "RESOURCE_AGENT_EVENT_RESUME",
            EventKind::GoCommand => "RESOURCE_AGENT_EVENT_GO_COMMAND",
            EventKind::ExecuteResource => "RESOURCE_AGENT_EVENT_EXECUTE_RESOURCE",
            EventKind::GetResourceCapabilities => "RESOURCE_AGENT_EVENT_GET_RESOURCE_CAPABILITIES",
            EventKind::LostConnection => "RESOURCE_AGENT_EVENT_LOST_CONNECTION",
            EventKind::Autoreconnect => "RESOURCE_AGENT_EVENT_AUTORECONNECT",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentEvent::ExecuteResource(cmd) => write!(f, "{}({})", self.kind(), cmd),
            other => write!(f, "{}", other.kind()),
        }
    }
}
