//! Restoring the operating state of a previous run.
//!
//! A fresh agent is walked up a fixed ladder of events until it reaches the
//! state recorded before the restart. Every step goes through the normal
//! event path and the state reached is checked before the next step.

use tracing::{debug, error, info, warn};

use dsagent_protocols::{AgentEvent, AgentState, DriverCommand};

use crate::error::AgentError;
use crate::handle::AgentHandle;

/// Result of a restore attempt. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Nothing recorded, or nothing to do.
    Skipped,
    /// The agent is now in this state.
    Restored(AgentState),
    /// A step failed; the agent stays where it got to.
    Failed {
        target: AgentState,
        reached: AgentState,
        reason: String,
    },
}

/// One rung of the ladder: the event to send and the states it may land in.
#[derive(Debug, Clone, PartialEq)]
struct Step {
    event: AgentEvent,
    accept: &'static [AgentState],
}

impl Step {
    fn new(event: AgentEvent, accept: &'static [AgentState]) -> Self {
        Self { event, accept }
    }
}

/// Event sequence leading from `Uninitialized` to `target`.
///
/// Command substates cannot be re-entered from outside, so they climb to
/// `Command`. Discovery may land in `ActiveUnknown`, which ends an
/// `ActiveUnknown` restore early; otherwise that restore goes on to
/// `Command`.
fn ladder(target: AgentState) -> Vec<Step> {
    use AgentState::*;

    let mut steps = Vec::new();
    if target == Uninitialized {
        return steps;
    }
    steps.push(Step::new(AgentEvent::Initialize, &[Inactive]));

    match target {
        Inactive => {}
        Idle => steps.push(Step::new(AgentEvent::GoActive, &[Idle])),
        ActiveUnknown => {
            steps.push(Step::new(AgentEvent::GoActive, &[ActiveUnknown, Idle]));
            steps.push(Step::new(AgentEvent::Run, &[Command]));
        }
        Streaming => {
            steps.push(Step::new(AgentEvent::GoActive, &[Idle]));
            steps.push(Step::new(AgentEvent::Run, &[Command]));
            steps.push(Step::new(
                AgentEvent::ExecuteResource(DriverCommand::StartAutosample),
                &[Streaming],
            ));
        }
        Paused => {
            steps.push(Step::new(AgentEvent::GoActive, &[Idle]));
            steps.push(Step::new(AgentEvent::Run, &[Command]));
            steps.push(Step::new(AgentEvent::Pause, &[Paused]));
        }
        state if state == Command || state.is_command_substate() => {
            steps.push(Step::new(AgentEvent::GoActive, &[Idle]));
            steps.push(Step::new(AgentEvent::Run, &[Command]));
        }
        // lost connection is swapped for the state when lost before climbing
        _ => {}
    }
    steps
}

/// Drives an agent back to a recorded state through its [`AgentHandle`].
pub struct StateRestorer {
    agent: AgentHandle,
}

impl StateRestorer {
    pub fn new(agent: AgentHandle) -> Self {
        Self { agent }
    }

    /// Restore `target`. When the recorded state is `LostConnection`, the
    /// state held at fault time (`prior`) is restored instead.
    pub async fn restore(
        &self,
        target: Option<AgentState>,
        prior: Option<AgentState>,
    ) -> RestoreOutcome {
        let Some(recorded) = target else {
            debug!("No prior operating state recorded");
            return RestoreOutcome::Skipped;
        };

        let target = if recorded == AgentState::LostConnection {
            match prior {
                Some(prior) if prior != AgentState::LostConnection => {
                    info!(%prior, "Prior run lost connection, restoring state held at fault time");
                    prior
                }
                _ => {
                    warn!("Prior run lost connection with no state recorded, nothing to restore");
                    return RestoreOutcome::Skipped;
                }
            }
        } else {
            recorded
        };

        let current = match self.agent.current_state().await {
            Ok(state) => state,
            Err(e) => return self.failed(target, AgentState::Uninitialized, e),
        };

        if current == target {
            info!(%target, "Agent already in prior state");
            return RestoreOutcome::Restored(target);
        }

        let steps = ladder(target);
        // resume above the highest rung we already stand on
        let start = if current == AgentState::Uninitialized {
            0
        } else {
            match steps.iter().rposition(|s| s.accept.contains(&current)) {
                Some(i) => i + 1,
                None => {
                    let reason = format!("current state {} is not on the way to {}", current, target);
                    error!(%target, %current, "Cannot restore agent state: {}", reason);
                    return RestoreOutcome::Failed {
                        target,
                        reached: current,
                        reason,
                    };
                }
            }
        };

        info!(%target, from = %current, "Restoring agent state");
        let mut reached = current;
        for step in &steps[start..] {
            let event_kind = step.event.kind();
            match self.agent.on_event(step.event.clone()).await {
                Ok(outcome) => {
                    reached = outcome.state;
                    if !step.accept.contains(&reached) {
                        let mismatch = AgentError::RestorationMismatch {
                            target,
                            event: event_kind,
                            expected: step.accept[0],
                            found: reached,
                        };
                        return self.failed(target, reached, mismatch);
                    }
                }
                Err(e) => return self.failed(target, reached, e),
            }

            if reached == target {
                break;
            }
        }

        if reached != target {
            info!(%target, %reached, "Restored agent to nearest reachable state");
        } else {
            info!(%target, "Agent state restored");
        }
        RestoreOutcome::Restored(reached)
    }

    fn failed(&self, target: AgentState, reached: AgentState, err: AgentError) -> RestoreOutcome {
        error!(%target, %reached, error = %err, "Error restoring agent state");
        RestoreOutcome::Failed {
            target,
            reached,
            reason: err.to_string(),
        }
    }
}
