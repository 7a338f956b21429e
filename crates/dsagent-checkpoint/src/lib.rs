//! # dsagent Checkpoint
//!
//! Persistence for the dataset agent.
//!
//! ## Features
//!
//! - Key/value state store with memory and file backends
//! - Driver memento stored under the fixed `dsa_state` key
//! - Prior-run record (`agent_state`, `state_when_lost`) read once at restart

pub mod error;
pub mod memento;
pub mod prior_run;
pub mod store;

pub use error::StoreError;
pub use memento::MementoStore;
pub use prior_run::{AGENT_STATE_KEY, PriorRunRecord, STATE_WHEN_LOST_KEY};
pub use store::{FileStateStore, MemoryStateStore, StateStore, open_store};
