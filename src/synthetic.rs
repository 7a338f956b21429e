//! Built-in synthetic driver.
//!
//! Emits a ramp of fake samples on a timer so the agent can be run without
//! real hardware. Its memento is `{"position": n}`, the number of samples
//! published so far, and a restarted driver picks up from there. Setting
//! `fail_after` makes it report one connection loss after that many samples,
//! which exercises the reconnect path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use dsagent_core::{DriverInit, DriverRegistry};
use dsagent_protocols::{
    AgentState, DatasetDriver, DriverCallbacks, DriverCommand, DriverError, DriverResponse,
};

pub(crate) const MODULE: &str = "dsagent.synthetic";
pub(crate) const CLASS: &str = "SyntheticDriver";

#[derive(Debug, Clone, Deserialize)]
struct SyntheticConfig {
    #[serde(default = "default_stream")]
    stream: String,
    #[serde(default = "default_interval_secs")]
    interval_secs: f64,
    #[serde(default = "default_batch")]
    batch: u64,
    #[serde(default)]
    fail_after: Option<u64>,
}

fn default_stream() -> String {
    "synthetic_parsed".to_string()
}

fn default_interval_secs() -> f64 {
    1.0
}

fn default_batch() -> u64 {
    5
}

pub(crate) fn register(registry: &DriverRegistry) -> Result<(), DriverError> {
    registry.register(MODULE, CLASS, |init: DriverInit| {
        let driver: Arc<dyn DatasetDriver> = Arc::new(SyntheticDriver::new(init)?);
        Ok(driver)
    })
}

struct Shared {
    config: SyntheticConfig,
    callbacks: Arc<dyn DriverCallbacks>,
    position: AtomicU64,
    failed: AtomicBool,
}

pub(crate) struct SyntheticDriver {
    shared: Arc<Shared>,
    interval: Duration,
    sampler: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticDriver {
    fn new(init: DriverInit) -> Result<Self, DriverError> {
        let config: SyntheticConfig = serde_json::from_value(init.config)
            .map_err(|e| DriverError::Custom(format!("invalid startup_config: {}", e)))?;
        if config.interval_secs <= 0.0 {
            return Err(DriverError::Custom(format!(
                "interval_secs must be positive, got {}",
                config.interval_secs
            )));
        }
        let interval = Duration::try_from_secs_f64(config.interval_secs)
            .map_err(|e| DriverError::Custom(format!("invalid interval_secs: {}", e)))?;

        let position = init
            .memento
            .as_ref()
            .and_then(|m| m.get("position"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        info!(position, stream = %config.stream, "Synthetic driver created");

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                callbacks: init.callbacks,
                position: AtomicU64::new(position),
                failed: AtomicBool::new(false),
            }),
            interval,
            sampler: Mutex::new(None),
        })
    }
}

async fn sample_loop(shared: Arc<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let start = shared.position.load(Ordering::SeqCst);
        let particles: Vec<Value> = (start..start + shared.config.batch)
            .map(|i| {
                json!({
                    "stream_name": shared.config.stream,
                    "position": i,
                    "value": (i as f64 / 10.0).sin(),
                })
            })
            .collect();

        let published = shared.callbacks.publish(particles).await as u64;
        let position = start + published;
        shared.position.store(position, Ordering::SeqCst);
        shared.callbacks.persist_state(json!({ "position": position })).await;
        debug!(position, published, "Synthetic batch published");

        if let Some(limit) = shared.config.fail_after {
            if position >= limit && !shared.failed.swap(true, Ordering::SeqCst) {
                shared
                    .callbacks
                    .exception(DriverError::ConnectionLost(format!(
                        "synthetic outage after {} samples",
                        position
                    )))
                    .await;
                return;
            }
        }
    }
}

#[async_trait]
impl DatasetDriver for SyntheticDriver {
    async fn start_sampling(&self) -> Result<(), DriverError> {
        let mut sampler = self.sampler.lock();
        if sampler.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }
        *sampler = Some(tokio::spawn(sample_loop(self.shared.clone(), self.interval)));
        info!("Synthetic sampling started");
        Ok(())
    }

    async fn stop_sampling(&self) -> Result<(), DriverError> {
        if let Some(handle) = self.sampler.lock().take() {
            handle.abort();
            info!("Synthetic sampling stopped");
        }
        Ok(())
    }

    async fn execute(&self, command: &DriverCommand) -> Result<DriverResponse, DriverError> {
        match command {
            DriverCommand::Discover => Ok(DriverResponse::stay()),
            DriverCommand::StartAutosample => Ok(DriverResponse::transition(AgentState::Streaming)),
            DriverCommand::StopAutosample => Ok(DriverResponse::transition(AgentState::Command)),
            DriverCommand::Other(name) if name == "GET_POSITION" => Ok(DriverResponse::stay()
                .with_result(json!({ "position": self.shared.position.load(Ordering::SeqCst) }))),
            other => Err(DriverError::Unsupported(other.to_string())),
        }
    }

    fn resource_capabilities(&self) -> Vec<String> {
        vec![
            DriverCommand::StartAutosample.to_string(),
            DriverCommand::StopAutosample.to_string(),
            "GET_POSITION".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsagent_protocols::{DriverFactory, DriverSpec, Memento};

    #[derive(Default)]
    struct Recorder {
        published: AtomicU64,
        mementos: Mutex<Vec<Memento>>,
        exceptions: AtomicU64,
    }

    #[async_trait]
    impl DriverCallbacks for Recorder {
        async fn publish(&self, particles: Vec<Value>) -> usize {
            self.published.fetch_add(particles.len() as u64, Ordering::SeqCst);
            particles.len()
        }

        async fn persist_state(&self, memento: Memento) {
            self.mementos.lock().push(memento);
        }

        async fn exception(&self, _error: DriverError) {
            self.exceptions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn build(config: Value, memento: Option<Memento>, recorder: Arc<Recorder>) -> Arc<dyn DatasetDriver> {
        let registry = DriverRegistry::new();
        register(&registry).unwrap();
        registry
            .create_driver(
                &DriverSpec {
                    module: MODULE.to_string(),
                    class: CLASS.to_string(),
                    egg: None,
                    config,
                },
                memento,
                recorder,
            )
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_resumes_from_memento() {
        let recorder = Arc::new(Recorder::default());
        let driver = build(
            json!({"interval_secs": 1.0, "batch": 5}),
            Some(json!({"position": 10})),
            recorder.clone(),
        );

        driver.start_sampling().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        driver.stop_sampling().await.unwrap();

        assert_eq!(recorder.published.load(Ordering::SeqCst), 10);
        assert_eq!(
            recorder.mementos.lock().last(),
            Some(&json!({"position": 20}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_after_reports_one_outage() {
        let recorder = Arc::new(Recorder::default());
        let driver = build(
            json!({"interval_secs": 1.0, "batch": 5, "fail_after": 5}),
            None,
            recorder.clone(),
        );

        driver.start_sampling().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(recorder.exceptions.load(Ordering::SeqCst), 1);

        // a restarted sampler does not fail again
        driver.start_sampling().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        driver.stop_sampling().await.unwrap();
        assert_eq!(recorder.exceptions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_commands() {
        let driver = build(json!({}), Some(json!({"position": 3})), Arc::new(Recorder::default()));

        let response = driver.execute(&DriverCommand::StartAutosample).await.unwrap();
        assert_eq!(response.next_state, Some(AgentState::Streaming));

        let response = driver
            .execute(&DriverCommand::Other("GET_POSITION".into()))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({"position": 3})));

        assert!(matches!(
            driver.execute(&DriverCommand::Other("CALIBRATE".into())).await,
            Err(DriverError::Unsupported(_))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let registry = DriverRegistry::new();
        register(&registry).unwrap();
        for config in [
            json!({"batch": "many"}),
            json!({"interval_secs": 0.0}),
            json!({"interval_secs": -1.5}),
        ] {
            let result = registry.create_driver(
                &DriverSpec {
                    module: MODULE.to_string(),
                    class: CLASS.to_string(),
                    egg: None,
                    config: config.clone(),
                },
                None,
                Arc::new(Recorder::default()),
            );
            assert!(matches!(result, Err(DriverError::Custom(_))), "{}", config);
        }
    }
}
