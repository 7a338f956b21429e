//! The dataset agent control loop.
//!
//! One task owns the state machine and the driver and handles commands one
//! at a time. Everything that wants to change agent state (operators, the
//! reconnect supervisor, driver callbacks, the restorer) goes through the
//! [`AgentHandle`] channel.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dsagent_checkpoint::{MementoStore, PriorRunRecord, StateStore};
use dsagent_config::{Config, ConfigError, ConfigValidator, MEMENTO_KEY};
use dsagent_protocols::{
    AgentEvent, AgentState, DatasetDriver, DriverCommand, DriverError, DriverFactory, DriverSpec,
    EventPublisher, Memento, Notification, NotificationType, SampleSink,
};
use dsagent_recovery::{ReconnectSupervisor, RecoveryError, RetryScheduler};

use crate::callbacks::AgentCallbacks;
use crate::error::AgentError;
use crate::fsm::{Handler, StateMachine, dataset_capability};
use crate::handle::{AgentCommand, AgentHandle, AutoreconnectTarget, EventOutcome};
use crate::stream::StreamPublisher;

/// External collaborators of an agent.
pub struct AgentDeps {
    pub factory: Arc<dyn DriverFactory>,
    pub store: Arc<dyn StateStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub sink: Arc<dyn SampleSink>,
}

pub struct DatasetAgent {
    config: Config,
    fsm: StateMachine,
    driver: Option<Arc<dyn DatasetDriver>>,
    factory: Arc<dyn DriverFactory>,
    store: Arc<dyn StateStore>,
    mementos: MementoStore,
    publisher: Arc<dyn EventPublisher>,
    stream: Arc<StreamPublisher>,
    supervisor: ReconnectSupervisor,
    state_when_lost: Option<AgentState>,
    commands: mpsc::WeakUnboundedSender<AgentCommand>,
    inbox: mpsc::UnboundedReceiver<AgentCommand>,
}

impl DatasetAgent {
    /// Build an agent and start its control task.
    ///
    /// Fails only on a bad retry configuration. Driver configuration is
    /// checked when the agent is initialized.
    pub fn spawn(
        config: Config,
        deps: AgentDeps,
    ) -> Result<(AgentHandle, JoinHandle<()>), AgentError> {
        let scheduler = RetryScheduler::from_config(&config.retry)?.shared();

        let (sender, inbox) = mpsc::unbounded_channel();
        let commands = sender.downgrade();

        let supervisor = ReconnectSupervisor::new(
            scheduler,
            Arc::new(AutoreconnectTarget {
                commands: commands.clone(),
            }),
        );

        let streams = config
            .stream_config
            .as_ref()
            .map(|s| s.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        let stream = Arc::new(StreamPublisher::new(streams, deps.sink));

        let agent = Self {
            fsm: StateMachine::dataset_agent(),
            driver: None,
            factory: deps.factory,
            mementos: MementoStore::new(deps.store.clone()),
            store: deps.store.clone(),
            publisher: deps.publisher,
            stream,
            supervisor,
            state_when_lost: None,
            commands,
            inbox,
            config,
        };

        let handle = AgentHandle::new(sender, deps.store);
        let task = tokio::spawn(agent.run());
        Ok((handle, task))
    }

    fn resource_id(&self) -> &str {
        &self.config.agent.resource_id
    }

    async fn run(mut self) {
        info!(resource_id = %self.resource_id(), "Dataset agent started");

        while let Some(command) = self.inbox.recv().await {
            match command {
                AgentCommand::Event { event, reply } => {
                    let result = self.on_event(event).await;
                    match reply {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                warn!(error = %e, "Queued event failed");
                            }
                        }
                    }
                }
                AgentCommand::CurrentState { reply } => {
                    let _ = reply.send(self.fsm.current_state());
                }
                AgentCommand::Shutdown { reply } => {
                    self.on_quit().await;
                    let _ = reply.send(());
                    return;
                }
            }
        }

        // every handle dropped
        self.on_quit().await;
    }

    async fn on_event(&mut self, event: AgentEvent) -> Result<EventOutcome, AgentError> {
        let state = self.fsm.current_state();
        let handler = match self.fsm.handler_for(&event) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(%state, %event, "Unhandled event");
                return Err(e);
            }
        };
        debug!(%state, %event, ?handler, "Handling event");

        let result = match handler {
            Handler::Initialize => {
                self.start_driver().await?;
                self.transition_to(AgentState::Inactive).await;
                None
            }
            Handler::GoActive => self.go_active().await?,
            Handler::GoTo(next) => {
                self.transition_to(next).await;
                None
            }
            Handler::ExecuteResource => match &event {
                AgentEvent::ExecuteResource(command) => self.execute_resource(command).await?,
                other => {
                    return Err(AgentError::UnhandledEvent {
                        state,
                        event: other.kind(),
                    });
                }
            },
            Handler::GetResourceCapabilities => Some(self.capabilities()),
            Handler::Reset => {
                self.reset().await;
                None
            }
            Handler::LostConnection => {
                self.state_when_lost = Some(state);
                self.transition_to(AgentState::LostConnection).await;
                None
            }
            Handler::Autoreconnect => self.autoreconnect().await?,
        };

        Ok(EventOutcome {
            state: self.fsm.current_state(),
            result,
        })
    }

    // ---- handlers ----

    async fn start_driver(&mut self) -> Result<(), AgentError> {
        let validation = ConfigValidator::validate_driver(&self.config);
        for warning in &validation.warnings {
            warn!("Config warning at {}: {}", warning.path, warning.message);
        }
        for err in &validation.errors {
            error!("Config error at {}: {}", err.path, err.message);
        }
        validation.into_result()?;

        let driver_config = &self.config.driver;
        let spec = DriverSpec {
            module: driver_config
                .dvr_mod
                .clone()
                .ok_or_else(|| ConfigError::MissingField("driver.dvr_mod".into()))?,
            class: driver_config
                .dvr_cls
                .clone()
                .ok_or_else(|| ConfigError::MissingField("driver.dvr_cls".into()))?,
            egg: driver_config.dvr_egg.clone(),
            config: driver_config
                .startup_config
                .clone()
                .ok_or_else(|| ConfigError::MissingField("driver.startup_config".into()))?,
        };

        let memento = self.load_memento().await?;
        let callbacks = Arc::new(AgentCallbacks::new(
            self.resource_id().to_string(),
            self.stream.clone(),
            self.publisher.clone(),
            self.mementos.clone(),
            self.commands.clone(),
        ));

        let driver = self.factory.create_driver(&spec, memento, callbacks)?;
        info!(driver = %spec.key(), "Driver client created");
        self.driver = Some(driver);

        self.stream.reset_connection();
        Ok(())
    }

    /// Stored memento, falling back to the one handed over in
    /// `agent.prior_state`. A handed-over memento is persisted right away.
    async fn load_memento(&self) -> Result<Option<Memento>, AgentError> {
        if let Some(memento) = self.mementos.load().await? {
            info!("Using process persistent state: {}", memento);
            return Ok(Some(memento));
        }

        match &self.config.agent.prior_state {
            None => Ok(None),
            Some(Value::Object(prior)) => match prior.get(MEMENTO_KEY) {
                Some(memento) if !memento.is_null() => {
                    info!("Using persistent state from prior agent run: {}", memento);
                    self.mementos.save(memento.clone()).await?;
                    Ok(Some(memento.clone()))
                }
                _ => Ok(None),
            },
            Some(other) => Err(ConfigError::invalid_value(
                "agent.prior_state",
                format!("must be a table, got {}", other),
            )
            .into()),
        }
    }

    async fn go_active(&mut self) -> Result<Option<Value>, AgentError> {
        let driver = self.driver()?;
        let response = driver.execute(&DriverCommand::Discover).await?;

        let next = match response.next_state {
            Some(AgentState::ActiveUnknown) => AgentState::ActiveUnknown,
            _ => AgentState::Idle,
        };
        self.transition_to(next).await;
        Ok(response.result)
    }

    async fn execute_resource(&mut self, command: &DriverCommand) -> Result<Option<Value>, AgentError> {
        let driver = self.driver()?;
        let response = driver.execute(command).await?;
        if let Some(next) = response.next_state {
            self.transition_to(next).await;
        }
        Ok(response.result)
    }

    fn capabilities(&self) -> Value {
        let agent: Vec<&str> = self
            .fsm
            .handled_events(self.fsm.current_state())
            .into_iter()
            .filter(|e| dataset_capability(*e))
            .map(|e| e.as_str())
            .collect();
        let resource = self
            .driver
            .as_ref()
            .map(|d| d.resource_capabilities())
            .unwrap_or_default();

        json!({ "agent": agent, "resource": resource })
    }

    async fn reset(&mut self) {
        // exit hooks still need the driver
        self.transition_to(AgentState::Uninitialized).await;
        self.state_when_lost = None;
        self.stop_driver().await;
    }

    async fn autoreconnect(&mut self) -> Result<Option<Value>, AgentError> {
        self.stream.reset_connection();

        // entering LostConnection always records this
        let target = self.state_when_lost.unwrap_or(AgentState::Inactive);

        if !target.is_data_producing() {
            info!(%target, "Connection lost outside data production, returning to prior state");
            self.transition_to(target).await;
            return Ok(None);
        }

        info!(%target, "Attempting to reconnect");
        let driver = self.driver()?;
        let response = driver.execute(&DriverCommand::StartAutosample).await?;
        debug!(next_state = ?response.next_state, "Start autosample result");

        match response.next_state {
            Some(next) => self.transition_to(next).await,
            None => warn!("Driver reported no state after resume, still reconnecting"),
        }
        Ok(response.result)
    }

    // ---- state changes ----

    async fn transition_to(&mut self, next: AgentState) {
        let prev = self.fsm.current_state();
        if next == prev {
            return;
        }

        self.on_exit(prev).await;
        self.fsm.set_state(next);
        info!(from = %prev, to = %next, "Agent state changed");
        self.on_enter(next, prev).await;
    }

    async fn on_enter(&mut self, state: AgentState, prev: AgentState) {
        if let Err(e) = PriorRunRecord::record_state(self.store.as_ref(), state).await {
            error!(error = %e, %state, "Failed to persist agent state");
        }
        self.publisher
            .publish_event(
                Notification::new(NotificationType::ResourceAgentStateEvent, self.resource_id())
                    .with_field("state", state.as_str())
                    .with_field("prev_state", prev.as_str()),
            )
            .await;

        match state {
            AgentState::Streaming => {
                if let Some(driver) = self.driver.clone() {
                    if let Err(e) = driver.start_sampling().await {
                        error!(error = %e, "Failed to start sampling");
                        self.queue_event(AgentEvent::LostConnection);
                    }
                }
            }
            AgentState::LostConnection => self.enter_lost_connection().await,
            _ => {}
        }
    }

    async fn enter_lost_connection(&mut self) {
        let state_when_lost = self.state_when_lost.unwrap_or(AgentState::Inactive);
        error!(
            resource_id = %self.resource_id(),
            %state_when_lost,
            "Dataset agent lost connection to the device"
        );

        if let Err(e) =
            PriorRunRecord::record_state_when_lost(self.store.as_ref(), state_when_lost).await
        {
            error!(error = %e, "Failed to persist state when lost");
        }

        self.publisher
            .publish_event(
                Notification::new(
                    NotificationType::ResourceAgentConnectionLostErrorEvent,
                    self.resource_id(),
                )
                .with_field("state_when_lost", state_when_lost.as_str()),
            )
            .await;

        match self.supervisor.start() {
            Ok(()) => {}
            Err(RecoveryError::AlreadyRunning) => debug!("Reconnect supervisor already running"),
            Err(e) => error!(error = %e, "Failed to start reconnect supervisor"),
        }
    }

    async fn on_exit(&mut self, state: AgentState) {
        match state {
            AgentState::Streaming => {
                if let Some(driver) = &self.driver {
                    if let Err(e) = driver.stop_sampling().await {
                        warn!(error = %e, "Failed to stop sampling");
                    }
                }
            }
            AgentState::LostConnection => self.supervisor.stop(),
            _ => {}
        }
    }

    // ---- helpers ----

    fn driver(&self) -> Result<Arc<dyn DatasetDriver>, AgentError> {
        self.driver
            .clone()
            .ok_or(AgentError::Driver(DriverError::NotStarted))
    }

    async fn stop_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            info!("Stopping driver");
            if let Err(e) = driver.shutdown().await {
                warn!(error = %e, "Driver shutdown failed");
            }
        }
    }

    /// Queue an event behind whatever is currently being handled.
    fn queue_event(&self, event: AgentEvent) {
        match self.commands.upgrade() {
            Some(commands) => {
                if commands
                    .send(AgentCommand::Event { event, reply: None })
                    .is_err()
                {
                    warn!("Control channel closed, event dropped");
                }
            }
            None => warn!("Agent has shut down, event dropped"),
        }
    }

    async fn on_quit(&mut self) {
        let state = self.fsm.current_state();
        info!(%state, "Dataset agent shutting down");

        self.supervisor.stop();

        match state {
            AgentState::Uninitialized => {}
            AgentState::Inactive => self.stop_driver().await,
            _ => {
                let stopped = match &self.driver {
                    Some(driver) => driver.stop_sampling().await,
                    None => Ok(()),
                };
                if let Err(e) = stopped {
                    warn!(error = %e, "Failed to stop sampling on quit, stopping driver");
                    self.stop_driver().await;
                }
            }
        }
    }
}
