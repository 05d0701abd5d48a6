//! Per-source circuit breaker.
//!
//! Removes a repeatedly-failing source from the chain for a while
//! instead of burning every symbol's retry budget against it. The
//! breaker is deliberately simple: a source is open once it has
//! accumulated `failure_threshold` consecutive failures, and a single
//! probe is allowed again after `recovery_timeout` has elapsed since
//! the last failure. State is in-memory and resets on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{info, warn};

#[derive(Debug, Default)]
struct SourceHealth {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Consecutive-failure gate over sources.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    states: Mutex<HashMap<String, SourceHealth>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the state map, recovering from poison if necessary. Worst
    /// case after recovery is a slightly wrong failure count.
    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, SourceHealth>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            warn!("circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether calls to this source are currently allowed.
    ///
    /// Once the recovery timeout has passed since the last failure the
    /// counter resets and a probe call is allowed through.
    pub fn is_closed(&self, source_name: &str) -> bool {
        let mut states = self.lock_states();
        let health = states.entry(source_name.to_string()).or_default();

        if health.consecutive_failures < self.failure_threshold {
            return true;
        }

        if let Some(last_failure) = health.last_failure {
            if last_failure.elapsed() >= self.recovery_timeout {
                info!(
                    "circuit breaker: allowing probe of '{}' after recovery timeout",
                    source_name
                );
                health.consecutive_failures = 0;
                return true;
            }
        }

        false
    }

    /// Record a successful call, resetting the failure count.
    pub fn record_success(&self, source_name: &str) {
        let mut states = self.lock_states();
        let health = states.entry(source_name.to_string()).or_default();
        health.consecutive_failures = 0;
        health.last_failure = None;
    }

    /// Record a failed call; may open the circuit.
    pub fn record_failure(&self, source_name: &str) {
        let mut states = self.lock_states();
        let health = states.entry(source_name.to_string()).or_default();

        health.consecutive_failures += 1;
        health.last_failure = Some(Instant::now());

        if health.consecutive_failures == self.failure_threshold {
            info!(
                "circuit breaker: opening circuit for '{}' after {} consecutive failures",
                source_name, health.consecutive_failures
            );
        }
    }

    /// Consecutive failures recorded for a source.
    pub fn failure_count(&self, source_name: &str) -> u32 {
        let states = self.lock_states();
        states
            .get(source_name)
            .map(|health| health.consecutive_failures)
            .unwrap_or(0)
    }
}
