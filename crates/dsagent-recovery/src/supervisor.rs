//! Background reconnect loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RecoveryError;
use crate::retry::SharedRetryScheduler;

/// Where reconnect attempts are delivered.
///
/// The agent implements this by submitting an autoreconnect event through
/// its command channel, so attempts are serialized with every other event.
#[async_trait]
pub trait ReconnectTarget: Send + Sync {
    async fn autoreconnect(&self) -> Result<(), RecoveryError>;
}

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningLoop {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Sleeps on the retry schedule and fires reconnect attempts until stopped.
///
/// The supervisor never judges whether an attempt worked; the target leaves
/// the lost-connection state on success and that path calls [`stop`].
///
/// [`stop`]: ReconnectSupervisor::stop
pub struct ReconnectSupervisor {
    scheduler: SharedRetryScheduler,
    target: Arc<dyn ReconnectTarget>,
    running: Mutex<Option<RunningLoop>>,
    attempts: Arc<AtomicU64>,
}

impl ReconnectSupervisor {
    pub fn new(scheduler: SharedRetryScheduler, target: Arc<dyn ReconnectTarget>) -> Self {
        Self {
            scheduler,
            target,
            running: Mutex::new(None),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the reconnect loop. Fails if it is already running.
    pub fn start(&self) -> Result<(), RecoveryError> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(RunningLoop::is_live) {
            return Err(RecoveryError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.scheduler.clone(),
            self.target.clone(),
            token.clone(),
            self.attempts.clone(),
        ));

        info!("Reconnect supervisor started");
        *running = Some(RunningLoop { token, handle });
        Ok(())
    }

    /// Signal the loop to stop. Returns without waiting for it to exit; no
    /// attempt fires after this returns.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.token.cancel();
            info!(
                attempts = self.attempts(),
                "Reconnect supervisor stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().as_ref().is_some_and(RunningLoop::is_live)
    }

    /// Total reconnect attempts fired over the supervisor's lifetime.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Drop for ReconnectSupervisor {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.token.cancel();
        }
    }
}

async fn run_loop(
    scheduler: SharedRetryScheduler,
    target: Arc<dyn ReconnectTarget>,
    token: CancellationToken,
    attempts: Arc<AtomicU64>,
) {
    // a stopped loop must not consume another slot of the schedule
    while !token.is_cancelled() {
        let delay = scheduler.lock().get_sleep_time();
        info!(
            delay_secs = delay.as_secs_f64(),
            "Next reconnect attempt scheduled"
        );

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        if token.is_cancelled() {
            break;
        }

        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(attempt, "Firing reconnect attempt");
        match target.autoreconnect().await {
            Ok(()) => debug!(attempt, "Reconnect attempt delivered"),
            Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
        }
    }

    debug!("Reconnect loop exited");
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
