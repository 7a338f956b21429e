//! Driver registry.
//!
//! The default [`DriverFactory`]: constructors registered under
//! `module.class`, looked up when the agent initializes.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use dsagent_protocols::{
    DatasetDriver, DriverCallbacks, DriverError, DriverFactory, DriverSpec, Memento,
};

/// Everything a driver constructor receives.
pub struct DriverInit {
    /// Driver `startup_config`.
    pub config: serde_json::Value,
    /// Checkpoint from a previous run, if any.
    pub memento: Option<Memento>,
    pub callbacks: Arc<dyn DriverCallbacks>,
}

/// Builds one kind of driver.
pub type DriverConstructor =
    Arc<dyn Fn(DriverInit) -> Result<Arc<dyn DatasetDriver>, DriverError> + Send + Sync>;

/// Registry of driver constructors keyed by `module.class`.
pub struct DriverRegistry {
    constructors: DashMap<String, DriverConstructor>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            constructors: DashMap::new(),
        }
    }

    /// Register a constructor for `module.class`.
    ///
    /// Returns an error if that key is already taken.
    pub fn register<F>(&self, module: &str, class: &str, constructor: F) -> Result<(), DriverError>
    where
        F: Fn(DriverInit) -> Result<Arc<dyn DatasetDriver>, DriverError> + Send + Sync + 'static,
    {
        let key = format!("{}.{}", module, class);
        if self.constructors.contains_key(&key) {
            return Err(DriverError::AlreadyRegistered(key));
        }
        info!("Registered driver: {}", key);
        self.constructors.insert(key, Arc::new(constructor));
        Ok(())
    }

    /// Remove the constructor for `module.class`.
    pub fn unregister(&self, module: &str, class: &str) -> Result<(), DriverError> {
        let key = format!("{}.{}", module, class);
        self.constructors
            .remove(&key)
            .ok_or(DriverError::NotRegistered(key))?;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.constructors.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverFactory for DriverRegistry {
    fn create_driver(
        &self,
        spec: &DriverSpec,
        memento: Option<Memento>,
        callbacks: Arc<dyn DriverCallbacks>,
    ) -> Result<Arc<dyn DatasetDriver>, DriverError> {
        let key = spec.key();
        // clone out so the map shard is not held while the driver is built
        let constructor = self
            .constructors
            .get(&key)
            .map(|c| c.value().clone())
            .ok_or_else(|| DriverError::NotRegistered(key.clone()))?;

        if let Some(egg) = &spec.egg {
            info!("Driver package {} is resolved locally as {}", egg, key);
        }
        info!("Instantiating driver plugin {}", key);

        constructor(DriverInit {
            config: spec.config.clone(),
            memento,
            callbacks,
        })
    }
}
