//! Engine configuration.

use std::time::Duration;

use crate::errors::EngineError;

/// Default floor between calls to the same source.
pub const DEFAULT_MIN_SOURCE_INTERVAL: Duration = Duration::from_millis(100);

/// Default retry budget per source per symbol.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default first backoff delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Default backoff ceiling.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(15);

/// Default bound on a single source call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(8);

/// Default worker pool width.
pub const DEFAULT_WORKER_LIMIT: usize = 10;

/// Default quote freshness window (15 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(900);

/// Default minimum batch size before a `fetch_many` pre-pass.
pub const DEFAULT_BATCH_THRESHOLD: usize = 5;

/// Default grace given to in-flight attempts after cancellation.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Default consecutive failures before a source's circuit opens.
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// Default wait before probing an open source again.
pub const DEFAULT_BREAKER_RECOVERY: Duration = Duration::from_secs(60);

/// Tuning knobs for the sync engine, read once at construction.
/// There is no hot reload; build a new engine to change them.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Minimum interval between calls to the same source.
    pub min_source_interval: Duration,
    /// Calls allowed per source per symbol before falling back.
    pub max_attempts: u32,
    /// First retry backoff; doubles per attempt.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_cap: Duration,
    /// Bound on each individual source call; an elapse is a retryable
    /// timeout consuming one attempt.
    pub call_timeout: Duration,
    /// Concurrent fetch workers per refresh.
    pub worker_limit: usize,
    /// How long a cached quote stays fresh.
    pub cache_ttl: Duration,
    /// Minimum number of uncached symbols before a batch pre-pass.
    pub batch_threshold: usize,
    /// How long in-flight attempts may run after cancellation before
    /// being abandoned.
    pub cancel_grace: Duration,
    /// Consecutive failures before a source's circuit opens.
    pub breaker_failure_threshold: u32,
    /// Wait before probing an open source again.
    pub breaker_recovery: Duration,
    /// Whether an authoritative "symbol not found" still falls through
    /// to the next source. Some symbols exist on one exchange feed and
    /// not another; deployments that mix feeds may want this on.
    pub fallback_on_not_found: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_source_interval: DEFAULT_MIN_SOURCE_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            worker_limit: DEFAULT_WORKER_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            breaker_failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            breaker_recovery: DEFAULT_BREAKER_RECOVERY,
            fallback_on_not_found: false,
        }
    }
}

impl SyncConfig {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.worker_limit == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_limit must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.batch_threshold == 0 {
            return Err(EngineError::InvalidConfig(
                "batch_threshold must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "call_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
