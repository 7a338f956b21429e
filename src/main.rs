//! dsagent - Dataset agent
//!
//! Main entry point for the dsagent CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dsagent_checkpoint::{MementoStore, PriorRunRecord, StateStore, open_store};
use dsagent_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig, StoreBackend};
use dsagent_core::{
    AgentDeps, AgentHandle, DatasetAgent, DriverRegistry, LogEventPublisher, LogSampleSink,
    RestoreOutcome, StateRestorer,
};
use dsagent_protocols::AgentState;

mod cli;
mod synthetic;

use cli::{Cli, Commands, StateAction};

/// Initialize tracing with console and, when a log directory is configured,
/// daily rolling file output.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level '{}'", logging.level))?,
    };

    let file_layer = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("dsagent")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // keep the writer alive for the whole process
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let (json_layer, text_layer) = if logging.json {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(true).with_ansi(true)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = ConfigLoader::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.logging)?;

    match cli.command {
        None => run_agent(config, AgentState::Streaming).await,
        Some(Commands::Run { initial_state }) => run_agent(config, initial_state).await,
        Some(Commands::State { action }) => handle_state_command(config, action).await,
    }
}

/// Run the agent in foreground until Ctrl-C.
async fn run_agent(config: Config, initial_state: AgentState) -> anyhow::Result<()> {
    info!("Starting dsagent v{}", env!("CARGO_PKG_VERSION"));

    let report = ConfigValidator::validate(&config)?;
    for warning in &report.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    report.into_result()?;

    let resource_id = config.agent.resource_id.clone();
    let store = open_store(&config.persistence, &resource_id).await?;

    let registry = DriverRegistry::new();
    synthetic::register(&registry)?;
    info!("Registered drivers: {:?}", registry.list_keys());

    let (handle, task) = DatasetAgent::spawn(
        config,
        AgentDeps {
            factory: Arc::new(registry),
            store,
            publisher: Arc::new(LogEventPublisher),
            sink: Arc::new(LogSampleSink),
        },
    )?;

    bring_up(&handle, initial_state).await?;
    info!(resource_id = %resource_id, "Agent running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    handle.shutdown().await?;
    task.await?;
    info!("dsagent stopped");
    Ok(())
}

/// Restore the prior run, or bring a fresh agent up to `initial_state`.
async fn bring_up(handle: &AgentHandle, initial_state: AgentState) -> anyhow::Result<()> {
    let outcome = match handle.restore_prior_run().await {
        RestoreOutcome::Skipped => {
            info!(%initial_state, "No prior run recorded");
            StateRestorer::new(handle.clone())
                .restore(Some(initial_state), None)
                .await
        }
        outcome => outcome,
    };

    match outcome {
        RestoreOutcome::Restored(state) => info!(%state, "Agent is up"),
        RestoreOutcome::Failed {
            target,
            reached,
            reason,
        } => error!(%target, %reached, "Agent came up short: {}", reason),
        RestoreOutcome::Skipped => {
            let state = handle.current_state().await?;
            info!(%state, "Agent is up");
        }
    }
    Ok(())
}

async fn handle_state_command(config: Config, action: StateAction) -> anyhow::Result<()> {
    if config.persistence.backend == StoreBackend::Memory {
        warn!("Persistence backend is memory, there is no stored state");
    }

    let resource_id = &config.agent.resource_id;
    let store: Arc<dyn StateStore> = open_store(&config.persistence, resource_id).await?;

    match action {
        StateAction::Show => {
            let record = PriorRunRecord::load(store.as_ref()).await?;
            let memento = MementoStore::new(store.clone()).load().await?;
            let report = json!({
                "resource_id": resource_id,
                "agent_state": record.last_operating_state.map(|s| s.as_str()),
                "state_when_lost": record.state_when_lost.map(|s| s.as_str()),
                "memento": memento,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StateAction::Clear => {
            store.clear().await?;
            println!("Cleared stored state for {}", resource_id);
        }
    }
    Ok(())
}
