//! Granule publishing and the connection sequence.
//!
//! Every granule carries a `connection_id` and a `connection_index`. The id
//! changes whenever continuity with earlier granules can no longer be
//! promised: at driver start, on every reconnect attempt, on a publish
//! failure, and when a particle asks for a new sequence.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use dsagent_protocols::{Granule, PublishError, SampleSink};

/// Particle key naming the destination stream.
pub const STREAM_NAME_KEY: &str = "stream_name";

/// Particle flag requesting a fresh connection sequence.
pub const NEW_SEQUENCE_KEY: &str = "new_sequence";

#[derive(Debug)]
struct ConnectionSequence {
    id: Uuid,
    index: u64,
}

impl ConnectionSequence {
    fn fresh() -> Self {
        Self {
            id: Uuid::new_v4(),
            index: 0,
        }
    }
}

/// Turns driver particles into granules on the configured streams.
pub struct StreamPublisher {
    streams: HashSet<String>,
    sink: Arc<dyn SampleSink>,
    sequence: Mutex<ConnectionSequence>,
}

impl StreamPublisher {
    pub fn new(streams: impl IntoIterator<Item = String>, sink: Arc<dyn SampleSink>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
            sink,
            sequence: Mutex::new(ConnectionSequence::fresh()),
        }
    }

    /// Start a new connection sequence.
    pub fn reset_connection(&self) {
        let mut sequence = self.sequence.lock();
        *sequence = ConnectionSequence::fresh();
        info!(connection_id = %sequence.id, "Connection sequence reset");
    }

    /// Current `(connection_id, next connection_index)`.
    pub fn connection(&self) -> (Uuid, u64) {
        let sequence = self.sequence.lock();
        (sequence.id, sequence.index)
    }

    /// Publish one particle.
    ///
    /// The particle must be a JSON object naming a configured stream under
    /// `stream_name`; every other key except `new_sequence` becomes a value
    /// of the granule.
    pub async fn publish_particle(&self, particle: Value) -> Result<(), PublishError> {
        let Value::Object(mut fields) = particle else {
            return Err(PublishError::MalformedParticle(format!(
                "expected a JSON object, got {}",
                particle
            )));
        };

        if fields.remove(NEW_SEQUENCE_KEY) == Some(Value::Bool(true)) {
            info!("New sequence flag detected in particle");
            self.reset_connection();
        }

        let stream = match fields.remove(STREAM_NAME_KEY) {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(PublishError::MalformedParticle(format!(
                    "stream_name must be a string, got {}",
                    other
                )));
            }
            None => {
                return Err(PublishError::MalformedParticle(
                    "missing stream_name".to_string(),
                ));
            }
        };
        if !self.streams.contains(&stream) {
            return Err(PublishError::MalformedParticle(format!(
                "unknown stream '{}'",
                stream
            )));
        }

        let (connection_id, connection_index) = {
            let mut sequence = self.sequence.lock();
            let index = sequence.index;
            sequence.index += 1;
            (sequence.id, index)
        };

        debug!(%stream, %connection_id, connection_index, "Publishing granule");
        self.sink
            .publish(Granule {
                stream,
                connection_id,
                connection_index,
                values: fields,
            })
            .await
    }
}

/// Sink that writes granules to the log.
pub struct LogSampleSink;

#[async_trait]
impl SampleSink for LogSampleSink {
    async fn publish(&self, granule: Granule) -> Result<(), PublishError> {
        let values = serde_json::to_string(&granule.values)?;
        info!(
            stream = %granule.stream,
            connection_id = %granule.connection_id,
            connection_index = granule.connection_index,
            %values,
            "Granule published"
        );
        Ok(())
    }
}
