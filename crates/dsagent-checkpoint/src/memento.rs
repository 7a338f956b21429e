//! Driver memento persistence.

use std::sync::Arc;
use tracing::debug;

use dsagent_config::MEMENTO_KEY;
use dsagent_protocols::Memento;

use crate::error::StoreError;
use crate::store::StateStore;

/// Stores the driver's opaque checkpoint under the fixed `dsa_state` key.
///
/// The value is never inspected; it is handed back to the driver verbatim.
#[derive(Clone)]
pub struct MementoStore {
    store: Arc<dyn StateStore>,
}

impl MementoStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Load the stored memento. A stored `null` counts as no memento.
    pub async fn load(&self) -> Result<Option<Memento>, StoreError> {
        let memento = self
            .store
            .get_state(MEMENTO_KEY)
            .await?
            .filter(|v| !v.is_null());
        debug!(present = memento.is_some(), "Loaded driver memento");
        Ok(memento)
    }

    /// Replace the stored memento.
    pub async fn save(&self, memento: Memento) -> Result<(), StoreError> {
        self.store.set_state(MEMENTO_KEY, memento).await
    }

    /// Forget the stored memento.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete_state(MEMENTO_KEY).await
    }
}
