//! Notification publishers.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use dsagent_protocols::{EventPublisher, Notification, NotificationType};

/// Fans notifications out to every subscriber.
///
/// Publishing with no subscribers is not an error; the notification is
/// dropped.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish_event(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            debug!("No notification subscribers");
        }
    }
}

/// Writes notifications to the log.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish_event(&self, notification: Notification) {
        let fields = serde_json::to_string(&notification.fields).unwrap_or_default();
        match notification.event_type {
            NotificationType::ResourceAgentConnectionLostErrorEvent => error!(
                event_type = %notification.event_type,
                origin = %notification.origin,
                origin_type = %notification.origin_type,
                %fields,
                "Agent notification"
            ),
            NotificationType::ResourceAgentErrorEvent => warn!(
                event_type = %notification.event_type,
                origin = %notification.origin,
                origin_type = %notification.origin_type,
                %fields,
                "Agent notification"
            ),
            NotificationType::ResourceAgentStateEvent => info!(
                event_type = %notification.event_type,
                origin = %notification.origin,
                origin_type = %notification.origin_type,
                %fields,
                "Agent notification"
            ),
        }
    }
}
