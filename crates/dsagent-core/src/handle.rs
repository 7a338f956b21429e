//! The agent's single event entry point.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use dsagent_checkpoint::{PriorRunRecord, StateStore};
use dsagent_protocols::{AgentEvent, AgentState};
use dsagent_recovery::{ReconnectTarget, RecoveryError};

use crate::error::AgentError;
use crate::restore::{RestoreOutcome, StateRestorer};

/// Result of a handled event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    /// State after the event.
    pub state: AgentState,
    /// Handler result, e.g. a driver command result or capabilities.
    pub result: Option<Value>,
}

pub(crate) type EventReply = oneshot::Sender<Result<EventOutcome, AgentError>>;

/// Messages processed, one at a time, by the control task.
pub(crate) enum AgentCommand {
    Event {
        event: AgentEvent,
        /// `None` for fire-and-forget submissions from driver callbacks.
        reply: Option<EventReply>,
    },
    CurrentState {
        reply: oneshot::Sender<AgentState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running agent.
#[derive(Clone)]
pub struct AgentHandle {
    commands: mpsc::UnboundedSender<AgentCommand>,
    store: Arc<dyn StateStore>,
}

impl AgentHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<AgentCommand>, store: Arc<dyn StateStore>) -> Self {
        Self { commands, store }
    }

    /// Submit an event and wait for it to be handled.
    pub async fn on_event(&self, event: AgentEvent) -> Result<EventOutcome, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(AgentCommand::Event {
                event,
                reply: Some(reply),
            })
            .map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)?
    }

    pub async fn current_state(&self) -> Result<AgentState, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(AgentCommand::CurrentState { reply })
            .map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)
    }

    /// Capabilities in the current state.
    pub async fn capabilities(&self) -> Result<Value, AgentError> {
        let outcome = self.on_event(AgentEvent::GetResourceCapabilities).await?;
        Ok(outcome.result.unwrap_or(Value::Null))
    }

    /// Bring the agent back to the state recorded by its previous run.
    ///
    /// An unreadable record is logged and treated as no record at all, so
    /// the caller can still bring the agent up fresh.
    pub async fn restore_prior_run(&self) -> RestoreOutcome {
        let record = match PriorRunRecord::load(self.store.as_ref()).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Unable to read prior run record, not restoring");
                return RestoreOutcome::Skipped;
            }
        };
        StateRestorer::new(self.clone())
            .restore(record.last_operating_state, record.state_when_lost)
            .await
    }

    /// Stop the agent. The control task exits once this returns.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(AgentCommand::Shutdown { reply })
            .map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Reconnect attempts from the supervisor.
///
/// Holds a weak sender so a running supervisor does not keep the control
/// task alive on its own.
pub(crate) struct AutoreconnectTarget {
    pub(crate) commands: mpsc::WeakUnboundedSender<AgentCommand>,
}

#[async_trait]
impl ReconnectTarget for AutoreconnectTarget {
    async fn autoreconnect(&self) -> Result<(), RecoveryError> {
        let commands = self
            .commands
            .upgrade()
            .ok_or_else(|| RecoveryError::Attempt("agent has shut down".to_string()))?;

        let (reply, rx) = oneshot::channel();
        commands
            .send(AgentCommand::Event {
                event: AgentEvent::Autoreconnect,
                reply: Some(reply),
            })
            .map_err(|_| RecoveryError::Attempt("agent has shut down".to_string()))?;
        // release our strong sender before waiting
        drop(commands);

        match rx.await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RecoveryError::Attempt(e.to_string())),
            Err(_) => Err(RecoveryError::Attempt("agent has shut down".to_string())),
        }
    }
}
