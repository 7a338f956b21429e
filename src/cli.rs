//! CLI definitions for dsagent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dsagent_protocols::AgentState;

/// dsagent CLI.
#[derive(Parser)]
#[command(name = "dsagent")]
#[command(about = "Dataset agent with connection-loss recovery")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the agent in foreground (default)
    Run {
        /// State to bring a fresh agent up to when no prior run is recorded
        #[arg(long, default_value = "STREAMING", value_parser = parse_state)]
        initial_state: AgentState,
    },

    /// Inspect or clear persisted agent state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum StateAction {
    /// Print the prior-run record and driver memento
    Show,

    /// Forget every persisted entry for this agent
    Clear,
}

fn parse_state(name: &str) -> Result<AgentState, String> {
    AgentState::parse(&name.to_ascii_uppercase()).ok_or_else(|| {
        let names: Vec<_> = AgentState::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown state '{}', expected one of {}", name, names.join(", "))
    })
}
