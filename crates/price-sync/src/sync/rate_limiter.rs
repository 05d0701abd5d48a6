//! Minimum-interval rate limiter for price sources.
//!
//! Enforces a floor on the time between consecutive outbound calls to a
//! given source, shared across all concurrent workers. Each source has
//! its own clock, so limiting one source never serializes calls to the
//! others.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::Mutex as AsyncMutex;

/// Last-call clock for a single source.
#[derive(Debug, Default)]
struct SourceClock {
    last_call: Option<Instant>,
}

/// Per-source minimum-interval rate limiter.
///
/// A short-lived mutex guards the source→clock map; the wait itself
/// happens under a per-source async mutex, which both serializes
/// callers to that source and keeps the stamped last-call time
/// monotonically non-decreasing.
pub struct RateLimiter {
    min_interval: Duration,
    clocks: Mutex<HashMap<String, Arc<AsyncMutex<SourceClock>>>>,
}

impl RateLimiter {
    /// Create a rate limiter enforcing `min_interval` between calls
    /// attributed to the same source.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            clocks: Mutex::new(HashMap::new()),
        }
    }

    /// The configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Lock the clocks map, recovering from poison if necessary.
    ///
    /// Worst case after recovery is one mistimed call, which beats
    /// panicking inside a fetch worker.
    fn lock_clocks(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<SourceClock>>>> {
        self.clocks.lock().unwrap_or_else(|poisoned| {
            warn!("rate limiter clock map mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn clock(&self, source_name: &str) -> Arc<AsyncMutex<SourceClock>> {
        let mut clocks = self.lock_clocks();
        clocks
            .entry(source_name.to_string())
            .or_default()
            .clone()
    }

    /// Wait until at least `min_interval` has elapsed since the last
    /// call attributed to `source_name`, then stamp the new call time.
    ///
    /// Never fails; worst case it delays the caller.
    pub async fn acquire(&self, source_name: &str) {
        let clock = self.clock(source_name);
        let mut clock = clock.lock().await;

        if let Some(last_call) = clock.last_call {
            let elapsed = last_call.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("rate limiter: waiting {:?} for '{}'", wait, source_name);
                tokio::time::sleep(wait).await;
            }
        }

        clock.last_call = Some(Instant::now());
    }
}
