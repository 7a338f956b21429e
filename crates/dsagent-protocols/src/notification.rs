//! Agent notifications published to the surrounding framework.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Origin type stamped on every dataset agent notification.
pub const ORIGIN_TYPE: &str = "Dataset";

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// The agent trapped a driver exception.
    ResourceAgentConnectionLostErrorEvent,
    /// A non-fatal error, e.g. a sample that failed to publish.
    ResourceAgentErrorEvent,
    /// The agent entered a new state.
    ResourceAgentStateEvent,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ResourceAgentConnectionLostErrorEvent => {
                "ResourceAgentConnectionLostErrorEvent"
            }
            NotificationType::ResourceAgentErrorEvent => "ResourceAgentErrorEvent",
            NotificationType::ResourceAgentStateEvent => "ResourceAgentStateEvent",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: NotificationType,
    pub origin_type: String,
    /// Resource id of the publishing agent.
    pub origin: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(event_type: NotificationType, origin: impl Into<String>) -> Self {
        Self {
            event_type,
            origin_type: ORIGIN_TYPE.to_string(),
            origin: origin.into(),
            fields: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Get a field as a string, if present.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

/// Event publishing layer.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_event(&self, notification: Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_defaults() {
        let n = Notification::new(NotificationType::ResourceAgentErrorEvent, "res-1");
        assert_eq!(n.origin_type, "Dataset");
        assert_eq!(n.origin, "res-1");
        assert!(n.fields.is_empty());
    }

    #[test]
    fn test_notification_fields() {
        let n = Notification::new(NotificationType::ResourceAgentStateEvent, "res-1")
            .with_field("state", "STREAMING");
        assert_eq!(n.field_str("state"), Some("STREAMING"));
        assert_eq!(n.field_str("missing"), None);
    }

    #[test]
    fn test_notification_type_names() {
        assert_eq!(
            NotificationType::ResourceAgentConnectionLostErrorEvent.to_string(),
            "ResourceAgentConnectionLostErrorEvent"
        );
    }
}
