//! # dsagent Config
//!
//! Configuration management for the dataset agent: the TOML schema, a loader
//! with environment variable substitution, and a validator that reports
//! every problem in one pass.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
