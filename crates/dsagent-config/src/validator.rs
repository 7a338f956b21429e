//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Fold all errors into a single [`ConfigError::Validation`].
    pub fn into_result(self) -> Result<Self, ConfigError> {
        if self.is_valid() {
            return Ok(self);
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Validation(joined))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the whole configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_agent(config, &mut result);
        Self::validate_retry(config, &mut result);
        Self::check_driver(config, &mut result);

        Ok(result)
    }

    /// Validate only what driver start-up needs: the driver keys and the
    /// stream configuration.
    pub fn validate_driver(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::check_driver(config, &mut result);
        result
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        if config.agent.resource_id.trim().is_empty() {
            result.add_error(ValidationError::new(
                "agent.resource_id",
                "resource_id cannot be empty",
            ));
        }

        if let Some(prior) = &config.agent.prior_state {
            if !prior.is_object() {
                result.add_error(ValidationError::new(
                    "agent.prior_state",
                    format!("prior_state must be a table, got {}", prior),
                ));
            }
        }
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        let retry = &config.retry;

        if !(retry.base_coefficient > 0.0) {
            result.add_error(ValidationError::new(
                "retry.base_coefficient",
                "base_coefficient must be > 0",
            ));
        }

        if !(retry.tolerance_coefficient > 1.0) {
            result.add_error(ValidationError::new(
                "retry.tolerance_coefficient",
                "tolerance_coefficient must be > 1",
            ));
        }

        if !(retry.max_interval_secs > 0.0) {
            result.add_error(ValidationError::new(
                "retry.max_interval_secs",
                "max_interval_secs must be > 0",
            ));
        } else if retry.max_interval_secs < retry.base_coefficient {
            result.add_warning(ValidationWarning::new(
                "retry.max_interval_secs",
                "max_interval_secs is below base_coefficient, every retry will use the ceiling",
            ));
        }
    }

    fn check_driver(config: &Config, result: &mut ValidationResult) {
        let driver = &config.driver;

        if driver.startup_config.is_none() {
            result.add_error(ValidationError::new("driver.startup_config", "missing key"));
        }
        if driver.dvr_mod.as_deref().is_none_or(str::is_empty) {
            result.add_error(ValidationError::new("driver.dvr_mod", "missing key"));
        }
        if driver.dvr_cls.as_deref().is_none_or(str::is_empty) {
            result.add_error(ValidationError::new("driver.dvr_cls", "missing key"));
        }

        match &config.stream_config {
            None => {
                result.add_error(ValidationError::new("stream_config", "missing key"));
            }
            Some(streams) if streams.is_empty() => {
                result.add_warning(ValidationWarning::new(
                    "stream_config",
                    "no streams configured, every sample will be rejected",
                ));
            }
            Some(_) => {}
        }

        if driver.max_records < 1 {
            result.add_error(ValidationError::new(
                "driver.max_records",
                format!(
                    "max_records={}, must be at least 1 or unset (default 100)",
                    driver.max_records
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
