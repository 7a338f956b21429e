//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// One or more validation errors, joined.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ConfigError::NotFound("agent.toml".to_string());
        assert!(err.to_string().contains("agent.toml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::MissingField("driver.dvr_mod".to_string());
        assert!(err.to_string().contains("driver.dvr_mod"));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("retry.tolerance_coefficient", "must be > 1");
        let display = err.to_string();
        assert!(display.contains("retry.tolerance_coefficient"));
        assert!(display.contains("must be > 1"));
    }

    #[test]
    fn test_env_var_not_set_error() {
        let err = ConfigError::EnvVarNotSet("DSA_HOME".to_string());
        assert!(err.to_string().contains("DSA_HOME"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = [").unwrap_err();
        let err: ConfigError = toml_err.into();
        assert!(err.to_string().contains("TOML"));
    }
}
