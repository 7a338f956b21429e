//! Explicit agent state machine.
//!
//! The machine itself only knows which handler applies to a `(state, event)`
//! pair and what the current state is. Running the handler, and the
//! enter/exit hooks around a state change, is the agent's job.

use std::collections::HashMap;

use dsagent_protocols::{AgentEvent, AgentState, EventKind};

use crate::error::AgentError;

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;

/// What to do for a `(state, event)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Validate driver config, build the driver, reset the connection.
    Initialize,
    /// Ask the driver to discover the resource state.
    GoActive,
    /// Move to the given state; only enter/exit hooks run.
    GoTo(AgentState),
    /// Forward a command to the driver and follow the state it reports.
    ExecuteResource,
    /// Report capabilities; never changes state.
    GetResourceCapabilities,
    /// Tear the driver down and return to uninitialized.
    Reset,
    /// Record the state held at fault time and start reconnecting.
    LostConnection,
    /// One reconnect attempt.
    Autoreconnect,
}

/// Agent events exposed as dataset agent capabilities.
pub fn dataset_capability(event: EventKind) -> bool {
    matches!(
        event,
        EventKind::Initialize
            | EventKind::Reset
            | EventKind::GoActive
            | EventKind::GoInactive
            | EventKind::Run
            | EventKind::Clear
            | EventKind::Pause
            | EventKind::Resume
            | EventKind::GoCommand
    )
}

/// Transition table plus the current state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: AgentState,
    table: HashMap<(AgentState, EventKind), Handler>,
}

impl StateMachine {
    /// Empty machine sitting in `initial`.
    pub fn new(initial: AgentState) -> Self {
        Self {
            current: initial,
            table: HashMap::new(),
        }
    }

    /// The dataset agent's transition table, starting uninitialized.
    pub fn dataset_agent() -> Self {
        use AgentState::*;

        let mut fsm = Self::new(Uninitialized);

        for state in AgentState::ALL {
            fsm.add_handler(state, EventKind::GetResourceCapabilities, Handler::GetResourceCapabilities);
        }

        fsm.add_handler(Uninitialized, EventKind::Initialize, Handler::Initialize);

        fsm.add_handler(Inactive, EventKind::GoActive, Handler::GoActive);

        fsm.add_handler(Idle, EventKind::Run, Handler::GoTo(Command));
        fsm.add_handler(Idle, EventKind::GoInactive, Handler::GoTo(Inactive));

        fsm.add_handler(Command, EventKind::ExecuteResource, Handler::ExecuteResource);
        fsm.add_handler(Command, EventKind::Pause, Handler::GoTo(Paused));
        fsm.add_handler(Command, EventKind::Clear, Handler::GoTo(Idle));
        fsm.add_handler(Command, EventKind::GoInactive, Handler::GoTo(Inactive));

        fsm.add_handler(Streaming, EventKind::ExecuteResource, Handler::ExecuteResource);
        fsm.add_handler(Streaming, EventKind::GoCommand, Handler::GoTo(Command));
        fsm.add_handler(Streaming, EventKind::GoInactive, Handler::GoTo(Inactive));

        fsm.add_handler(Paused, EventKind::Resume, Handler::GoTo(Command));
        fsm.add_handler(Paused, EventKind::Clear, Handler::GoTo(Idle));

        fsm.add_handler(ActiveUnknown, EventKind::GoInactive, Handler::GoTo(Inactive));
        fsm.add_handler(ActiveUnknown, EventKind::GoCommand, Handler::GoTo(Command));

        for state in [Test, Calibrate, DirectAccess, Busy] {
            fsm.add_handler(state, EventKind::GoCommand, Handler::GoTo(Command));
        }

        for state in AgentState::ALL {
            if state != Uninitialized {
                fsm.add_handler(state, EventKind::Reset, Handler::Reset);
            }
        }

        for state in [Inactive, Idle, Command, Streaming, Paused, ActiveUnknown] {
            fsm.add_handler(state, EventKind::LostConnection, Handler::LostConnection);
        }

        fsm.add_handler(LostConnection, EventKind::Autoreconnect, Handler::Autoreconnect);

        fsm
    }

    /// Register (or replace) the handler for `event` in `state`.
    pub fn add_handler(&mut self, state: AgentState, event: EventKind, handler: Handler) {
        self.table.insert((state, event), handler);
    }

    pub fn current_state(&self) -> AgentState {
        self.current
    }

    pub(crate) fn set_state(&mut self, state: AgentState) {
        self.current = state;
    }

    pub fn lookup(&self, state: AgentState, event: EventKind) -> Option<Handler> {
        self.table.get(&(state, event)).copied()
    }

    /// Handler for `event` in the current state.
    pub fn handler_for(&self, event: &AgentEvent) -> Result<Handler, AgentError> {
        self.lookup(self.current, event.kind())
            .ok_or(AgentError::UnhandledEvent {
                state: self.current,
                event: event.kind(),
            })
    }

    /// Events with a handler in `state`, in a stable order.
    pub fn handled_events(&self, state: AgentState) -> Vec<EventKind> {
        let mut events: Vec<_> = self
            .table
            .keys()
            .filter(|(s, _)| *s == state)
            .map(|(_, e)| *e)
            .collect();
        events.sort_by_key(|e| e.as_str());
        events
    }
}
