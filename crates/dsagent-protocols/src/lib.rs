//! # dsagent Protocols
//!
//! Shared vocabulary for the dataset agent. Contains only type and
//! interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`DatasetDriver`] - Pluggable data-source driver
//! - [`DriverCallbacks`] - How a driver talks back to its agent
//! - [`DriverFactory`] - Builds drivers from a [`DriverSpec`]
//! - [`EventPublisher`] - Notification bus
//! - [`SampleSink`] - Destination of published granules

pub mod driver;
pub mod error;
pub mod notification;
pub mod sample;
pub mod state;

pub use driver::{DatasetDriver, DriverCallbacks, DriverFactory, DriverResponse, DriverSpec, Memento};
pub use error::{DriverError, PublishError};
pub use notification::{EventPublisher, Notification, NotificationType, ORIGIN_TYPE};
pub use sample::{Granule, SampleSink};
pub use state::{AgentEvent, AgentState, DriverCommand, EventKind};
