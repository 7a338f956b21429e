//! # dsagent Recovery
//!
//! Connection-loss recovery primitives for the dataset agent.
//!
//! ## Features
//!
//! - Factorial backoff with a latched ceiling and a staleness reset
//! - Cancellable reconnect loop that fires attempts through the agent's
//!   single event entry point
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dsagent_recovery::{ReconnectSupervisor, RetryScheduler};
//!
//! let scheduler = RetryScheduler::from_config(&config.retry)?.shared();
//! let supervisor = ReconnectSupervisor::new(scheduler, target);
//! supervisor.start()?;
//! // ... later, once the connection is back
//! supervisor.stop();
//! ```

pub mod error;
pub mod retry;
pub mod supervisor;

pub use error::RecoveryError;
pub use retry::{RetryScheduler, SharedRetryScheduler};
pub use supervisor::{ReconnectSupervisor, ReconnectTarget};
