//! What the previous run of an agent was doing when it stopped.

use serde_json::Value;
use tracing::debug;

use dsagent_protocols::AgentState;

use crate::error::StoreError;
use crate::store::StateStore;

/// Store key of the last operating state.
pub const AGENT_STATE_KEY: &str = "agent_state";

/// Store key of the state held when the connection was last lost.
pub const STATE_WHEN_LOST_KEY: &str = "state_when_lost";

/// Prior-run record, read once at restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorRunRecord {
    pub last_operating_state: Option<AgentState>,
    pub state_when_lost: Option<AgentState>,
}

impl PriorRunRecord {
    /// Read both keys from `store`.
    pub async fn load(store: &dyn StateStore) -> Result<Self, StoreError> {
        let record = Self {
            last_operating_state: read_state(store, AGENT_STATE_KEY).await?,
            state_when_lost: read_state(store, STATE_WHEN_LOST_KEY).await?,
        };
        debug!(
            last_operating_state = ?record.last_operating_state,
            state_when_lost = ?record.state_when_lost,
            "Loaded prior run record"
        );
        Ok(record)
    }

    /// Persist the state just entered.
    pub async fn record_state(store: &dyn StateStore, state: AgentState) -> Result<(), StoreError> {
        store
            .set_state(AGENT_STATE_KEY, Value::String(state.as_str().to_string()))
            .await
    }

    /// Persist the state held when a connection fault was trapped.
    pub async fn record_state_when_lost(
        store: &dyn StateStore,
        state: AgentState,
    ) -> Result<(), StoreError> {
        store
            .set_state(STATE_WHEN_LOST_KEY, Value::String(state.as_str().to_string()))
            .await
    }
}

async fn read_state(store: &dyn StateStore, key: &str) -> Result<Option<AgentState>, StoreError> {
    match store.get_state(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) if name.is_empty() => Ok(None),
        Some(Value::String(name)) => AgentState::parse(&name)
            .map(Some)
            .ok_or_else(|| StoreError::invalid_value(key, format!("unknown state '{}'", name))),
        Some(other) => Err(StoreError::invalid_value(
            key,
            format!("expected a state name, found {}", other),
        )),
    }
}
