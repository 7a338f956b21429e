//! Published samples.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PublishError;

/// One published sample, tagged with its position in the connection sequence.
///
/// Consumers use `connection_id` and `connection_index` to detect gaps: a new
/// id means continuity with earlier granules is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    pub stream: String,
    pub connection_id: Uuid,
    pub connection_index: u64,
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Downstream sink for granules.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn publish(&self, granule: Granule) -> Result<(), PublishError>;
}
