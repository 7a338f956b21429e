//! Recovery errors.

use thiserror::Error;

/// Errors raised by the retry scheduler and reconnect supervisor.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Retry parameters out of range.
    #[error("Invalid retry configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called while the reconnect loop is still running.
    #[error("Reconnect supervisor already running")]
    AlreadyRunning,

    /// A reconnect attempt was delivered but did not succeed.
    #[error("Reconnect attempt failed: {0}")]
    Attempt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_error() {
        let err = RecoveryError::InvalidConfig("tolerance_coefficient must be > 1".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Invalid retry configuration"));
        assert!(msg.contains("tolerance_coefficient"));
    }

    #[test]
    fn test_already_running_error() {
        assert!(RecoveryError::AlreadyRunning.to_string().contains("already running"));
    }

    #[test]
    fn test_attempt_error() {
        let err = RecoveryError::Attempt("driver refused".to_string());
        assert!(err.to_string().contains("driver refused"));
    }
}
