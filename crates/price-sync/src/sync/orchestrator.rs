//! Bounded-concurrency batch orchestration.
//!
//! Turns a refresh request into per-symbol outcomes: cache hits resolve
//! immediately, everything else is fetched through the source chain on
//! a bounded worker pool, and the pieces are merged into one
//! [`FetchSummary`]. No symbol's failure affects any other symbol.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::errors::FetchError;
use crate::models::{FetchOutcome, FetchSummary, Symbol};
use crate::source::SourceChain;

use super::cache::CacheStore;
use super::config::SyncConfig;

/// Schedules one refresh call's worth of fetch work.
pub struct BatchOrchestrator {
    chain: Arc<SourceChain>,
    cache: Arc<CacheStore>,
    worker_limit: usize,
    batch_threshold: usize,
    cancel_grace: Duration,
}

impl BatchOrchestrator {
    pub fn new(chain: Arc<SourceChain>, cache: Arc<CacheStore>, config: &SyncConfig) -> Self {
        Self {
            chain,
            cache,
            worker_limit: config.worker_limit,
            batch_threshold: config.batch_threshold,
            cancel_grace: config.cancel_grace,
        }
    }

    /// Resolve every requested symbol to exactly one outcome.
    ///
    /// 1. De-duplicate the input; duplicates share one outcome.
    /// 2. Fresh cache entries resolve immediately, touching neither the
    ///    network nor the rate limiter (unless bypass is forced).
    /// 3. A batch-capable source may answer large requests in one
    ///    pre-pass call; whatever it leaves unanswered falls through.
    /// 4. The rest runs on the worker pool through the source chain,
    ///    with successes written to the cache as they land.
    /// 5. On cancellation, in-flight attempts get a grace period to
    ///    finish; abandoned symbols report `Cancelled`.
    pub async fn run(
        &self,
        symbols: &[Symbol],
        force_bypass_cache: bool,
        cancel: CancellationToken,
    ) -> FetchSummary {
        let started = Instant::now();
        let mut summary = FetchSummary::new();

        let unique = dedupe(symbols);
        if unique.is_empty() {
            summary.set_elapsed(started.elapsed());
            return summary;
        }

        // Cache partition. Freshness is judged once, against a single
        // "now", so a borderline entry can't flip mid-partition.
        let now = Utc::now();
        let mut needs_fetch = Vec::new();
        for symbol in unique {
            if !force_bypass_cache {
                if let Some(entry) = self.cache.get(&symbol) {
                    if entry.is_fresh_at(now) {
                        summary.record_cache_hit(entry.quote);
                        continue;
                    }
                }
            }
            needs_fetch.push(symbol);
        }

        debug!(
            "refresh: {} fresh from cache, {} to fetch",
            summary.hits(),
            needs_fetch.len()
        );

        let mut remaining = needs_fetch;
        if remaining.len() >= self.batch_threshold && !cancel.is_cancelled() {
            remaining = self.batch_prepass(remaining, &mut summary).await;
        }

        if !remaining.is_empty() {
            self.fetch_individually(remaining, &mut summary, &cancel)
                .await;
        }

        summary.set_elapsed(started.elapsed());
        summary
    }

    /// One `fetch_many` against the first batch-capable source. Symbols
    /// it answers are done; symbols missing from the response map or
    /// carrying errors are returned for the per-symbol path, so a
    /// partial batch response never fails the whole batch.
    async fn batch_prepass(
        &self,
        symbols: Vec<Symbol>,
        summary: &mut FetchSummary,
    ) -> Vec<Symbol> {
        let Some(results) = self.chain.fetch_batch(&symbols).await else {
            return symbols;
        };

        let mut remaining = Vec::new();
        for symbol in symbols {
            match results.get(&symbol) {
                Some(Ok(quote)) => {
                    self.cache.put(quote.clone());
                    summary.record_fetched(symbol, FetchOutcome::Success(quote.clone()));
                }
                Some(Err(error)) => {
                    debug!(
                        "batch answer for {} was an error ({}), using per-symbol path",
                        symbol, error
                    );
                    remaining.push(symbol);
                }
                None => {
                    debug!("{} missing from batch response, using per-symbol path", symbol);
                    remaining.push(symbol);
                }
            }
        }
        remaining
    }

    /// Fan the symbols out over the worker pool and collect outcomes in
    /// whatever order tasks finish; summary content is independent of
    /// completion order.
    async fn fetch_individually(
        &self,
        symbols: Vec<Symbol>,
        summary: &mut FetchSummary,
        cancel: &CancellationToken,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.worker_limit));
        let mut tasks: JoinSet<(Symbol, FetchOutcome)> = JoinSet::new();

        for symbol in symbols {
            let chain = Arc::clone(&self.chain);
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let grace = self.cancel_grace;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (symbol, FetchOutcome::Failure(FetchError::Cancelled)),
                };

                let fetch = chain.fetch_with_fallback(&symbol, &cancel);
                tokio::pin!(fetch);

                let outcome = tokio::select! {
                    result = &mut fetch => match result {
                        Ok(quote) => {
                            cache.put(quote.clone());
                            FetchOutcome::Success(quote)
                        }
                        Err(error) => FetchOutcome::Failure(error),
                    },
                    () = abandoned_after_grace(&cancel, grace) => {
                        FetchOutcome::Failure(FetchError::Cancelled)
                    }
                };

                (symbol, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, outcome)) => summary.record_fetched(symbol, outcome),
                Err(join_error) => warn!("fetch worker failed to join: {}", join_error),
            }
        }
    }
}

/// First-occurrence de-duplication; empty symbols are dropped.
fn dedupe(symbols: &[Symbol]) -> Vec<Symbol> {
    let mut seen = HashSet::with_capacity(symbols.len());
    let mut unique = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if symbol.is_empty() {
            warn!("ignoring empty symbol in refresh request");
            continue;
        }
        if seen.insert(symbol.clone()) {
            unique.push(symbol.clone());
        }
    }
    unique
}

/// Resolves once the token fires and the grace period has then passed.
async fn abandoned_after_grace(cancel: &CancellationToken, grace: Duration) {
    cancel.cancelled().await;
    tokio::time::sleep(grace).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_preserves_first_occurrence_order() {
        let symbols = vec![
            Symbol::new("AAA"),
            Symbol::new("bbb"),
            Symbol::new("AAA"),
            Symbol::new("CCC"),
            Symbol::new("BBB"),
        ];
        let unique = dedupe(&symbols);
        assert_eq!(
            unique,
            vec![Symbol::new("AAA"), Symbol::new("BBB"), Symbol::new("CCC")]
        );
    }

    #[test]
    fn test_dedupe_drops_empty_symbols() {
        let symbols = vec![Symbol::new("  "), Symbol::new("AAA")];
        assert_eq!(dedupe(&symbols), vec![Symbol::new("AAA")]);
    }
}
