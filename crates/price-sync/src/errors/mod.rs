//! Error types and retry classification for price synchronization.
//!
//! This module provides:
//! - [`FetchError`]: per-symbol fetch failures, classified via
//!   [`retry_class`](FetchError::retry_class)
//! - [`EngineError`]: construction-time configuration errors
//! - [`RetryClass`]: classification consumed by the retry policy and chain

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

use crate::models::Symbol;

/// Failures scoped to a single symbol during a refresh.
///
/// No variant ever aborts the whole refresh; each failure is reported
/// in the [`FetchSummary`](crate::models::FetchSummary) for its symbol.
#[derive(Clone, Debug, Error)]
pub enum FetchError {
    /// The call to the source did not complete in time.
    /// Retryable; consumes one attempt.
    #[error("request to '{source_name}' timed out")]
    Timeout {
        /// Source that timed out.
        source_name: String,
    },

    /// The source signalled a rate limit (HTTP 429 or equivalent).
    /// Retryable; `retry_after` carries the provider's delay hint if one
    /// was supplied, and the retry policy honors it over computed backoff.
    #[error("rate limited by '{source_name}'")]
    RateLimited {
        /// Source that rate limited the request.
        source_name: String,
        /// Provider-suggested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// A plausibly temporary failure: 5xx-equivalent responses, malformed
    /// payloads, non-positive prices.
    #[error("transient error from '{source_name}': {message}")]
    Transient {
        /// Source that produced the error.
        source_name: String,
        /// Description of the failure.
        message: String,
    },

    /// The source authoritatively does not know this symbol.
    /// Terminal: no same-source retry, and no fallback either unless the
    /// chain was configured with `fallback_on_not_found`.
    #[error("symbol not found: {symbol}")]
    NotFound {
        /// The unknown symbol.
        symbol: Symbol,
    },

    /// Every source in the chain failed or was skipped for this symbol.
    #[error("all sources exhausted for {symbol}")]
    AllSourcesExhausted {
        /// The symbol that could not be fetched anywhere.
        symbol: Symbol,
    },

    /// The fetch task was abandoned because the caller cancelled the refresh.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharefolio_price_sync::{FetchError, RetryClass, Symbol};
    ///
    /// let error = FetchError::Timeout { source_name: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Retryable);
    ///
    /// let error = FetchError::NotFound { symbol: Symbol::new("ZZZ") };
    /// assert_eq!(error.retry_class(), RetryClass::Terminal);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Transient { .. } => {
                RetryClass::Retryable
            }
            Self::NotFound { .. } | Self::AllSourcesExhausted { .. } | Self::Cancelled => {
                RetryClass::Terminal
            }
        }
    }

    /// Provider-suggested delay before the next attempt, if the source
    /// sent one with a rate-limit response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Programming/configuration errors surfaced at engine construction,
/// never mid-batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was built without any price source.
    #[error("source chain is empty")]
    EmptySourceChain,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A concrete source failed to initialize (client construction,
    /// connector setup).
    #[error("failed to initialize source '{source_name}': {message}")]
    SourceInit {
        /// Source that failed to come up.
        source_name: String,
        /// Underlying failure description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let error = FetchError::Timeout {
            source_name: "YAHOO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Retryable);
    }

    #[test]
    fn test_rate_limited_is_retryable_and_carries_hint() {
        let error = FetchError::RateLimited {
            source_name: "NSE".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(error.retry_class(), RetryClass::Retryable);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_transient_is_retryable() {
        let error = FetchError::Transient {
            source_name: "NSE".to_string(),
            message: "internal server error".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Retryable);
        assert_eq!(error.retry_after(), None);
    }

    #[test]
    fn test_not_found_is_terminal() {
        let error = FetchError::NotFound {
            symbol: Symbol::new("INVALID"),
        };
        assert_eq!(error.retry_class(), RetryClass::Terminal);
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let error = FetchError::AllSourcesExhausted {
            symbol: Symbol::new("AAA"),
        };
        assert_eq!(error.retry_class(), RetryClass::Terminal);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert_eq!(FetchError::Cancelled.retry_class(), RetryClass::Terminal);
    }

    #[test]
    fn test_error_display() {
        let error = FetchError::NotFound {
            symbol: Symbol::new("invalid"),
        };
        assert_eq!(format!("{}", error), "symbol not found: INVALID");

        let error = FetchError::Timeout {
            source_name: "YAHOO".to_string(),
        };
        assert_eq!(format!("{}", error), "request to 'YAHOO' timed out");
    }
}
