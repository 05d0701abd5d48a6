//! Ordered fallback chain over price sources.
//!
//! The chain tries sources in a fixed priority order. For a given
//! symbol, a source that keeps failing with retryable errors is retried
//! under the retry policy, then abandoned in favor of the next source
//! with a fresh retry budget. A terminal error (unknown symbol) is
//! authoritative and stops the chain for that symbol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::errors::{EngineError, FetchError, RetryClass};
use crate::models::{Quote, Symbol};
use crate::sync::{CircuitBreaker, RateLimiter, RetryPolicy};

use super::traits::PriceSource;

/// Ordered fallback chain with rate limiting, retry, and circuit breaking.
pub struct SourceChain {
    sources: Vec<Arc<dyn PriceSource>>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    circuit_breaker: Arc<CircuitBreaker>,
    call_timeout: Duration,
    fallback_on_not_found: bool,
}

impl SourceChain {
    /// Create a chain over the given sources, first source first.
    ///
    /// Fails with [`EngineError::EmptySourceChain`] when no sources are
    /// supplied; this is the only construction-time failure.
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
        circuit_breaker: Arc<CircuitBreaker>,
        call_timeout: Duration,
        fallback_on_not_found: bool,
    ) -> Result<Self, EngineError> {
        if sources.is_empty() {
            return Err(EngineError::EmptySourceChain);
        }
        Ok(Self {
            sources,
            rate_limiter,
            retry_policy,
            circuit_breaker,
            call_timeout,
            fallback_on_not_found,
        })
    }

    /// The registered sources, in priority order.
    pub fn sources(&self) -> &[Arc<dyn PriceSource>] {
        &self.sources
    }

    /// Fetch one symbol, walking the chain:
    ///
    /// 1. Skip sources whose circuit is open.
    /// 2. Retry the current source under the retry policy.
    /// 3. On retry exhaustion, advance to the next source with a fresh budget.
    /// 4. A terminal error stops the walk (no fallback on `NotFound`
    ///    unless configured).
    /// 5. Nothing left yields `AllSourcesExhausted`.
    pub async fn fetch_with_fallback(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Quote, FetchError> {
        for source in &self.sources {
            let name = source.name();

            if !self.circuit_breaker.is_closed(name) {
                debug!("circuit open for '{}', skipping for {}", name, symbol);
                continue;
            }

            match self.fetch_from_source(source.as_ref(), symbol, cancel).await {
                Ok(quote) => return Ok(quote),
                Err(error) if error.retry_class() == RetryClass::Terminal => {
                    if matches!(error, FetchError::NotFound { .. }) && self.fallback_on_not_found {
                        debug!(
                            "'{}' does not know {}, trying next source",
                            name, symbol
                        );
                        continue;
                    }
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        "source '{}' exhausted for {}: {}, falling back",
                        name, symbol, error
                    );
                }
            }
        }

        Err(FetchError::AllSourcesExhausted {
            symbol: symbol.clone(),
        })
    }

    /// Retry loop against a single source. Each attempt is rate-limited
    /// and bounded by the per-attempt timeout; an elapse counts as a
    /// retryable timeout consuming one attempt.
    async fn fetch_from_source(
        &self,
        source: &dyn PriceSource,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Quote, FetchError> {
        let name = source.name();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempt += 1;

            self.rate_limiter.acquire(name).await;

            let result = match tokio::time::timeout(self.call_timeout, source.fetch_one(symbol))
                .await
            {
                Ok(result) => result.and_then(check_price),
                Err(_) => Err(FetchError::Timeout {
                    source_name: name.to_string(),
                }),
            };

            match result {
                Ok(quote) => {
                    self.circuit_breaker.record_success(name);
                    debug!("'{}' answered {} = {}", name, symbol, quote.price);
                    return Ok(quote);
                }
                Err(error) => {
                    if error.retry_class() == RetryClass::Retryable {
                        self.circuit_breaker.record_failure(name);
                    }

                    match self.retry_policy.should_retry(attempt, &error) {
                        Some(delay) => {
                            debug!(
                                "attempt {} on '{}' for {} failed ({}), retrying in {:?}",
                                attempt, name, symbol, error, delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(error),
                    }
                }
            }
        }
    }

    /// One rate-limited, timeout-bounded `fetch_many` against the first
    /// batch-capable source whose circuit is closed. Returns `None` when
    /// no such source exists or the call timed out; per-symbol errors
    /// stay in the map for the caller to route to the per-symbol path.
    pub(crate) async fn fetch_batch(
        &self,
        symbols: &[Symbol],
    ) -> Option<HashMap<Symbol, Result<Quote, FetchError>>> {
        let source = self
            .sources
            .iter()
            .find(|s| s.supports_batch() && self.circuit_breaker.is_closed(s.name()))?;
        let name = source.name();

        debug!("batch fetching {} symbols from '{}'", symbols.len(), name);
        self.rate_limiter.acquire(name).await;

        match tokio::time::timeout(self.call_timeout, source.fetch_many(symbols)).await {
            Ok(results) => {
                let mut checked: HashMap<Symbol, Result<Quote, FetchError>> =
                    HashMap::with_capacity(results.len());
                let mut any_ok = false;
                for (symbol, result) in results {
                    let result = result.and_then(check_price);
                    any_ok |= result.is_ok();
                    checked.insert(symbol, result);
                }
                if any_ok {
                    self.circuit_breaker.record_success(name);
                }
                Some(checked)
            }
            Err(_) => {
                warn!("batch fetch from '{}' timed out", name);
                self.circuit_breaker.record_failure(name);
                None
            }
        }
    }
}

/// A quote with a non-positive price is provider garbage; treat it as
/// transient so the retry/fallback machinery applies.
fn check_price(quote: Quote) -> Result<Quote, FetchError> {
    if quote.price > Decimal::ZERO {
        Ok(quote)
    } else {
        Err(FetchError::Transient {
            source_name: quote.source_name.clone(),
            message: format!("non-positive price {} for {}", quote.price, quote.symbol),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;
    use rust_decimal_macros::dec;

    fn chain_over(
        sources: Vec<Arc<dyn PriceSource>>,
        max_attempts: u32,
        fallback_on_not_found: bool,
    ) -> SourceChain {
        SourceChain::new(
            sources,
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::new(
                max_attempts,
                Duration::from_millis(1),
                Duration::from_millis(4),
            ),
            Arc::new(CircuitBreaker::new(u32::MAX, Duration::from_secs(60))),
            Duration::from_millis(100),
            fallback_on_not_found,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_chain_is_a_construction_error() {
        let result = SourceChain::new(
            Vec::new(),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)),
            Arc::new(CircuitBreaker::new(5, Duration::from_secs(60))),
            Duration::from_secs(8),
            false,
        );
        assert!(matches!(result, Err(EngineError::EmptySourceChain)));
    }

    #[tokio::test]
    async fn test_success_on_first_source() {
        let source = Arc::new(MockSource::new("PRIMARY", |_, _| Ok(dec!(101))));
        let chain = chain_over(vec![source.clone()], 3, false);

        let quote = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(quote.price, dec!(101));
        assert_eq!(quote.source_name, "PRIMARY");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_bound_then_fallback() {
        // Always-failing retryable source is called exactly max_attempts
        // times before the chain advances.
        let primary = Arc::new(MockSource::new("PRIMARY", |_, _| {
            Err(FetchError::Transient {
                source_name: "PRIMARY".to_string(),
                message: "boom".to_string(),
            })
        }));
        let secondary = Arc::new(MockSource::new("SECONDARY", |_, _| Ok(dec!(42))));
        let chain = chain_over(vec![primary.clone(), secondary.clone()], 3, false);

        let quote = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(quote.source_name, "SECONDARY");
    }

    #[tokio::test]
    async fn test_transient_failures_then_success_on_same_source() {
        // Fails on attempts 1 and 2, succeeds on attempt 3.
        let source = Arc::new(MockSource::new("FLAKY", |_, call| {
            if call < 2 {
                Err(FetchError::Timeout {
                    source_name: "FLAKY".to_string(),
                })
            } else {
                Ok(dec!(250))
            }
        }));
        let chain = chain_over(vec![source.clone()], 3, false);

        let quote = chain
            .fetch_with_fallback(&Symbol::new("BBB"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.calls(), 3);
        assert_eq!(quote.price, dec!(250));
    }

    #[tokio::test]
    async fn test_not_found_is_authoritative() {
        let primary = Arc::new(MockSource::new("PRIMARY", |symbol, _| {
            Err(FetchError::NotFound {
                symbol: symbol.clone(),
            })
        }));
        let secondary = Arc::new(MockSource::new("SECONDARY", |_, _| Ok(dec!(1))));
        let chain = chain_over(vec![primary.clone(), secondary.clone()], 3, false);

        let error = chain
            .fetch_with_fallback(&Symbol::new("ZZZ"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::NotFound { .. }));
        // Exactly one call: no same-source retry, no fallback.
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_fallback_when_configured() {
        let primary = Arc::new(MockSource::new("PRIMARY", |symbol, _| {
            Err(FetchError::NotFound {
                symbol: symbol.clone(),
            })
        }));
        let secondary = Arc::new(MockSource::new("SECONDARY", |_, _| Ok(dec!(9))));
        let chain = chain_over(vec![primary.clone(), secondary.clone()], 3, true);

        let quote = chain
            .fetch_with_fallback(&Symbol::new("ZZZ"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(quote.source_name, "SECONDARY");
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_exhausted() {
        let a = Arc::new(MockSource::new("A", |_, _| {
            Err(FetchError::Transient {
                source_name: "A".to_string(),
                message: "down".to_string(),
            })
        }));
        let b = Arc::new(MockSource::new("B", |_, _| {
            Err(FetchError::Transient {
                source_name: "B".to_string(),
                message: "down".to_string(),
            })
        }));
        let chain = chain_over(vec![a.clone(), b.clone()], 2, false);

        let error = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::AllSourcesExhausted { .. }));
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_source_times_out_per_attempt() {
        let slow = Arc::new(
            MockSource::new("SLOW", |_, _| Ok(dec!(1))).with_delay(Duration::from_secs(5)),
        );
        let chain = SourceChain::new(
            vec![slow.clone()],
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(4)),
            Arc::new(CircuitBreaker::new(u32::MAX, Duration::from_secs(60))),
            Duration::from_millis(20),
            false,
        )
        .unwrap();

        let error = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap_err();

        // Each elapse consumed one attempt; both were spent on the only source.
        assert!(matches!(error, FetchError::AllSourcesExhausted { .. }));
        assert_eq!(slow.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_price_is_transient() {
        let source = Arc::new(MockSource::new("BROKEN", |_, call| {
            if call == 0 {
                Ok(dec!(0))
            } else {
                Ok(dec!(75))
            }
        }));
        let chain = chain_over(vec![source.clone()], 3, false);

        let quote = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(quote.price, dec!(75));
    }

    #[tokio::test]
    async fn test_open_circuit_skips_source() {
        let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(600)));
        breaker.record_failure("PRIMARY");

        let primary = Arc::new(MockSource::new("PRIMARY", |_, _| Ok(dec!(1))));
        let secondary = Arc::new(MockSource::new("SECONDARY", |_, _| Ok(dec!(2))));
        let chain = SourceChain::new(
            vec![primary.clone(), secondary.clone()],
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)),
            breaker,
            Duration::from_millis(100),
            false,
        )
        .unwrap();

        let quote = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(primary.calls(), 0);
        assert_eq!(quote.source_name, "SECONDARY");
    }

    #[tokio::test]
    async fn test_cancelled_before_any_attempt() {
        let source = Arc::new(MockSource::new("PRIMARY", |_, _| Ok(dec!(1))));
        let chain = chain_over(vec![source.clone()], 3, false);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = chain
            .fetch_with_fallback(&Symbol::new("AAA"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Cancelled));
        assert_eq!(source.calls(), 0);
    }
}
