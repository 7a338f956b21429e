//! Callbacks handed to the driver.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use dsagent_checkpoint::MementoStore;
use dsagent_protocols::{
    AgentEvent, DriverCallbacks, DriverError, EventPublisher, Memento, Notification,
    NotificationType,
};

use crate::handle::AgentCommand;
use crate::stream::StreamPublisher;

/// How a driver talks back to its agent.
///
/// Publishing and persisting happen directly on the caller's task.
/// Exceptions are queued on the control channel without waiting, since the
/// driver may be reporting from inside a call the control task is awaiting.
pub struct AgentCallbacks {
    resource_id: String,
    stream: Arc<StreamPublisher>,
    publisher: Arc<dyn EventPublisher>,
    mementos: MementoStore,
    commands: mpsc::WeakUnboundedSender<AgentCommand>,
}

impl AgentCallbacks {
    pub(crate) fn new(
        resource_id: String,
        stream: Arc<StreamPublisher>,
        publisher: Arc<dyn EventPublisher>,
        mementos: MementoStore,
        commands: mpsc::WeakUnboundedSender<AgentCommand>,
    ) -> Self {
        Self {
            resource_id,
            stream,
            publisher,
            mementos,
            commands,
        }
    }
}

#[async_trait]
impl DriverCallbacks for AgentCallbacks {
    async fn publish(&self, particles: Vec<Value>) -> usize {
        let mut published = 0;
        for particle in particles {
            debug!("Particle received: {}", particle);
            match self.stream.publish_particle(particle).await {
                Ok(()) => published += 1,
                Err(e) => {
                    error!(error = %e, published, "Error publishing particle");

                    // continuity can no longer be promised
                    self.stream.reset_connection();

                    self.publisher
                        .publish_event(
                            Notification::new(
                                NotificationType::ResourceAgentErrorEvent,
                                &self.resource_id,
                            )
                            .with_field("error_msg", format!("Sample Parsing Exception: {}", e)),
                        )
                        .await;
                    break;
                }
            }
        }
        published
    }

    async fn persist_state(&self, memento: Memento) {
        debug!("Saving driver state: {}", memento);
        if let Err(e) = self.mementos.save(memento).await {
            error!(error = %e, "Failed to persist driver state");
        }
    }

    async fn exception(&self, error: DriverError) {
        error!(error = %error, "Exception detected in the driver");

        let Some(commands) = self.commands.upgrade() else {
            warn!("Agent has shut down, dropping driver exception");
            return;
        };
        if commands
            .send(AgentCommand::Event {
                event: AgentEvent::LostConnection,
                reply: None,
            })
            .is_err()
        {
            warn!("Agent has shut down, dropping driver exception");
        } else {
            info!("Queued lost connection event");
        }
    }
}
