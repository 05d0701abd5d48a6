//! Price synchronization engine facade.

use std::sync::Arc;

use chrono::Utc;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::errors::EngineError;
use crate::models::{FetchSummary, Quote, Symbol};
use crate::source::{PriceSource, SourceChain};

use super::cache::CacheStore;
use super::circuit_breaker::CircuitBreaker;
use super::config::SyncConfig;
use super::orchestrator::BatchOrchestrator;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;

/// The portfolio store as the engine sees it: just the set of symbols
/// currently held. Implemented by the storage layer, out of scope here.
pub trait HoldingsStore: Send + Sync {
    fn list_distinct_symbols(&self) -> Vec<Symbol>;
}

/// Freshness classification of a cached quote, for display paths that
/// distinguish "no data yet" from "stale value shown with a warning".
#[derive(Clone, Debug, PartialEq)]
pub enum QuoteState {
    /// Never fetched; nothing to show.
    Missing,
    /// Cached and within the TTL window.
    Fresh(Quote),
    /// Cached but past the TTL window; show with a warning.
    Stale(Quote),
}

/// Facade over the cache, chain, and orchestrator.
///
/// `refresh` is the only operation that touches the network; it returns
/// a cancellable future and never blocks the caller beyond awaiting it.
/// Everything else reads the cache synchronously.
pub struct PriceSyncEngine {
    cache: Arc<CacheStore>,
    orchestrator: BatchOrchestrator,
}

impl PriceSyncEngine {
    /// Build an engine over the given sources, first source first.
    ///
    /// Configuration problems (empty chain, zero workers) fail here,
    /// never mid-batch.
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        config: SyncConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_source_interval));
        let retry_policy =
            RetryPolicy::new(config.max_attempts, config.backoff_base, config.backoff_cap);
        let circuit_breaker = Arc::new(CircuitBreaker::new(
            config.breaker_failure_threshold,
            config.breaker_recovery,
        ));
        let chain = Arc::new(SourceChain::new(
            sources,
            rate_limiter,
            retry_policy,
            circuit_breaker,
            config.call_timeout,
            config.fallback_on_not_found,
        )?);
        let cache = Arc::new(CacheStore::new(config.cache_ttl));
        let orchestrator = BatchOrchestrator::new(chain, Arc::clone(&cache), &config);

        Ok(Self {
            cache,
            orchestrator,
        })
    }

    /// Obtain a current price for every symbol, preferring fresh cache
    /// entries unless `force_bypass_cache` is set.
    ///
    /// Safe to call repeatedly; repeated calls within the TTL window are
    /// cheap and issue no network traffic. Cancelling via the token
    /// abandons in-flight work after a grace period.
    pub async fn refresh(
        &self,
        symbols: &[Symbol],
        force_bypass_cache: bool,
        cancel: CancellationToken,
    ) -> FetchSummary {
        let summary = self
            .orchestrator
            .run(symbols, force_bypass_cache, cancel)
            .await;
        info!(
            "refresh finished: {} outcomes, {} hits, {} misses, {} failures in {:?}",
            summary.len(),
            summary.hits(),
            summary.misses(),
            summary.failures(),
            summary.elapsed()
        );
        summary
    }

    /// Refresh every symbol currently held in the portfolio.
    pub async fn refresh_holdings(
        &self,
        store: &dyn HoldingsStore,
        cancel: CancellationToken,
    ) -> FetchSummary {
        let symbols = store.list_distinct_symbols();
        self.refresh(&symbols, false, cancel).await
    }

    /// Last known quote for a symbol, fresh or stale. Synchronous and
    /// never touches the network; safe on display paths.
    pub fn get_cached(&self, symbol: &Symbol) -> Option<Quote> {
        self.cache.latest_quote(symbol)
    }

    /// Freshness classification for a symbol's cached quote.
    pub fn quote_state(&self, symbol: &Symbol) -> QuoteState {
        match self.cache.get(symbol) {
            None => QuoteState::Missing,
            Some(entry) if entry.is_fresh_at(Utc::now()) => QuoteState::Fresh(entry.quote),
            Some(entry) => QuoteState::Stale(entry.quote),
        }
    }
}
