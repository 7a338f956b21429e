//! State store errors.

use thiserror::Error;

/// State store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The state document on disk is not a JSON object.
    #[error("Corrupt state document {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// A stored value could not be interpreted.
    #[error("Invalid value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl StoreError {
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
