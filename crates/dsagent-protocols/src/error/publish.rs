//! Sample publishing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// The particle could not be interpreted as a sample.
    #[error("Malformed particle: {0}")]
    MalformedParticle(String),

    /// The downstream sink rejected the granule.
    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
