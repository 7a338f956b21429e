//! Driver errors.

use thiserror::Error;

/// Errors surfaced by a dataset driver or by driver construction.
///
/// At the agent layer every runtime driver error is treated as retryable.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver lost connection: {0}")]
    ConnectionLost(String),

    #[error("Driver command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Driver command not supported: {0}")]
    Unsupported(String),

    #[error("No driver registered for {0}")]
    NotRegistered(String),

    #[error("Driver already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Driver not started")]
    NotStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl DriverError {
    /// Shorthand for a failed command.
    pub fn command_failed(command: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_lost() {
        let err = DriverError::ConnectionLost("socket closed".to_string());
        assert!(err.to_string().contains("lost connection"));
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn test_command_failed() {
        let err = DriverError::command_failed("DRIVER_EVENT_START_AUTOSAMPLE", "busy");
        let msg = err.to_string();
        assert!(msg.contains("START_AUTOSAMPLE"));
        assert!(msg.contains("busy"));
    }

    #[test]
    fn test_not_registered() {
        let err = DriverError::NotRegistered("mi.dataset.Driver".to_string());
        assert!(err.to_string().contains("mi.dataset.Driver"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DriverError = io_err.into();
        assert!(err.to_string().contains("missing"));
    }
}
