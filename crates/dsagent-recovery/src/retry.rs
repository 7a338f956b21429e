//! Factorial reconnect backoff.
//!
//! Sleep times grow as `base * n!` seconds until they reach the ceiling. Once
//! a computed interval has hit the ceiling its index is latched, and later
//! calls at or past that index return the ceiling without recomputing.
//!
//! A retry that arrives much later than expected (more than
//! `tolerance * expected interval` after the previous one) starts the
//! sequence over, so a fresh fault episode is not punished for an old one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use dsagent_config::RetryConfig;

use crate::error::RecoveryError;

/// Scheduler shared between its owner and the reconnect loop.
pub type SharedRetryScheduler = Arc<Mutex<RetryScheduler>>;

/// Computes how long to wait before the next reconnect attempt.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    base_coefficient: f64,
    tolerance_coefficient: f64,
    max_interval: f64,
    max_retry_index: Option<u64>,
    last_retry: Option<Instant>,
    retry_count: u64,
}

impl RetryScheduler {
    /// Create a scheduler. All values are in seconds.
    pub fn new(
        base_coefficient: f64,
        tolerance_coefficient: f64,
        max_interval: f64,
    ) -> Result<Self, RecoveryError> {
        if !(base_coefficient > 0.0 && base_coefficient.is_finite()) {
            return Err(RecoveryError::InvalidConfig(format!(
                "base_coefficient must be > 0, got {}",
                base_coefficient
            )));
        }
        if !(tolerance_coefficient > 1.0 && tolerance_coefficient.is_finite()) {
            return Err(RecoveryError::InvalidConfig(format!(
                "tolerance_coefficient must be > 1, got {}",
                tolerance_coefficient
            )));
        }
        if !(max_interval > 0.0 && max_interval.is_finite()) {
            return Err(RecoveryError::InvalidConfig(format!(
                "max_interval must be > 0, got {}",
                max_interval
            )));
        }

        Ok(Self {
            base_coefficient,
            tolerance_coefficient,
            max_interval,
            max_retry_index: None,
            last_retry: None,
            retry_count: 0,
        })
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self, RecoveryError> {
        Self::new(
            config.base_coefficient,
            config.tolerance_coefficient,
            config.max_interval_secs,
        )
    }

    /// Wrap for sharing with a [`ReconnectSupervisor`](crate::ReconnectSupervisor).
    pub fn shared(self) -> SharedRetryScheduler {
        Arc::new(Mutex::new(self))
    }

    /// Number of retries in the current sequence.
    pub fn retry_count(&self) -> u64 {
        self.retry_count
    }

    /// Index at which the ceiling was first reached, if it has been.
    pub fn max_retry_index(&self) -> Option<u64> {
        self.max_retry_index
    }

    /// Clear the retry sequence. The latched ceiling index is kept.
    pub fn reset(&mut self) {
        self.last_retry = None;
        self.retry_count = 0;
    }

    /// Next sleep time, measured from now.
    pub fn get_sleep_time(&mut self) -> Duration {
        self.get_sleep_time_at(Instant::now())
    }

    /// Next sleep time, as if called at `now`.
    pub fn get_sleep_time_at(&mut self, now: Instant) -> Duration {
        self.clear_if_stale(now);

        self.last_retry = Some(now);
        self.retry_count += 1;

        let secs = self.calc_sleep_time(self.retry_count - 1);
        debug!(
            retry_count = self.retry_count,
            sleep_secs = secs,
            "Computed reconnect sleep time"
        );
        self.to_duration(secs)
    }

    /// Sleep time, in seconds, for retry `index`.
    pub fn calc_sleep_time(&mut self, index: u64) -> f64 {
        if let Some(max_index) = self.max_retry_index {
            if max_index <= self.retry_count {
                return self.max_interval;
            }
        }

        let timeout = self.base_coefficient * factorial(index);
        if timeout >= self.max_interval {
            self.max_retry_index = Some(index + 1);
            self.max_interval
        } else {
            timeout
        }
    }

    fn clear_if_stale(&mut self, now: Instant) {
        let index = self.retry_count.saturating_sub(1);
        let window = self.calc_sleep_time(index) * self.tolerance_coefficient;

        let stale = match self.last_retry {
            None => true,
            Some(last) => now.saturating_duration_since(last).as_secs_f64() > window,
        };
        if stale {
            if self.retry_count > 0 {
                debug!(
                    retry_count = self.retry_count,
                    "Retry sequence went stale, starting over"
                );
            }
            self.reset();
        }
    }

    fn to_duration(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs)
            .or_else(|_| Duration::try_from_secs_f64(self.max_interval))
            .unwrap_or(Duration::MAX)
    }
}

/// `n!` as a float; saturates to infinity for large `n`.
fn factorial(n: u64) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
