//! # dsagent Core
//!
//! The dataset agent itself.
//!
//! ## Components
//!
//! - [`StateMachine`] - Transition table keyed by `(state, event)`
//! - [`DatasetAgent`] - Control loop owning the state machine and the driver
//! - [`AgentHandle`] - Single entry point for events, used by operators,
//!   the reconnect supervisor and driver callbacks alike
//! - [`StateRestorer`] - Replays events to bring a fresh agent back to its
//!   prior operating state
//! - [`StreamPublisher`] - Connection sequence and granule publishing
//! - [`DriverRegistry`] - Default driver factory keyed by `module.class`

pub mod agent;
pub mod callbacks;
pub mod error;
pub mod events;
pub mod fsm;
pub mod handle;
pub mod registry;
pub mod restore;
pub mod stream;

pub use agent::{AgentDeps, DatasetAgent};
pub use callbacks::AgentCallbacks;
pub use error::AgentError;
pub use events::{BroadcastEventPublisher, LogEventPublisher};
pub use fsm::{Handler, StateMachine, dataset_capability};
pub use handle::{AgentHandle, EventOutcome};
pub use registry::{DriverConstructor, DriverInit, DriverRegistry};
pub use restore::{RestoreOutcome, StateRestorer};
pub use stream::{LogSampleSink, StreamPublisher};
