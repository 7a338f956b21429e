//! Key/value state storage.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use dsagent_config::{PersistenceConfig, StoreBackend};

use crate::error::StoreError;

/// Persistence backend used by the agent.
///
/// Values are schema-less JSON and are stored verbatim.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_state(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete_state(&self, key: &str) -> Result<(), StoreError>;

    /// Every stored entry.
    async fn entries(&self) -> Result<HashMap<String, Value>, StoreError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Build the store selected by configuration for one agent.
pub async fn open_store(
    config: &PersistenceConfig,
    resource_id: &str,
) -> Result<Arc<dyn StateStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory state store for {}", resource_id);
            Ok(Arc::new(MemoryStateStore::new()))
        }
        StoreBackend::File => {
            let store = FileStateStore::open(&config.path, resource_id).await?;
            info!("Using file state store at {:?}", store.path());
            Ok(Arc::new(store))
        }
    }
}

/// In-memory state store, for tests and ephemeral agents.
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_state(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn entries(&self) -> Result<HashMap<String, Value>, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// File backed state store.
///
/// One JSON document per agent:
/// ```text
/// {storage_path}/
/// └── {resource_id}.json
/// ```
/// Every write replaces the whole document through a temporary file and a
/// rename, so a crash never leaves a half written document behind.
pub struct FileStateStore {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
}

impl FileStateStore {
    /// Open (or create) the state document for `resource_id` under
    /// `storage_path`.
    pub async fn open(
        storage_path: impl AsRef<Path>,
        resource_id: &str,
    ) -> Result<Self, StoreError> {
        let storage_path = storage_path.as_ref();
        fs::create_dir_all(storage_path).await?;

        let path = storage_path.join(format!("{}.json", Self::sanitize_id(resource_id)));
        let document = Self::read_document(&path).await?;

        debug!(
            "FileStateStore opened at {:?} with {} entries",
            path,
            document.len()
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Path of the state document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitize a resource id for use as a file name.
    fn sanitize_id(resource_id: &str) -> String {
        resource_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }

    async fn read_document(path: &Path) -> Result<Map<String, Value>, StoreError> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: format!("expected a JSON object, found {}", type_name(&other)),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_state(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.document.lock().await.get(key).cloned())
    }

    async fn set_state(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        document.insert(key.to_string(), value);
        self.write_document(&document).await?;
        debug!("Persisted state key '{}' to {:?}", key, self.path);
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        if document.remove(key).is_some() {
            self.write_document(&document).await?;
            debug!("Deleted state key '{}'", key);
        }
        Ok(())
    }

    async fn entries(&self) -> Result<HashMap<String, Value>, StoreError> {
        let document = self.document.lock().await;
        Ok(document.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        document.clear();
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
