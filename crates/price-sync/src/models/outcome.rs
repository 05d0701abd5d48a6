use std::collections::HashMap;
use std::time::Duration;

use crate::errors::FetchError;

use super::quote::Quote;
use super::symbol::Symbol;

/// The result of one refresh for one symbol: exactly one of a quote
/// or a failure, never both.
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    Success(Quote),
    Failure(FetchError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Success(quote) => Some(quote),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

/// Per-call aggregate result of a refresh: one outcome per requested
/// symbol plus counters. Produced fresh on every refresh; not persisted.
#[derive(Debug, Default)]
pub struct FetchSummary {
    outcomes: HashMap<Symbol, FetchOutcome>,
    hits: usize,
    misses: usize,
    failures: usize,
    elapsed: Duration,
}

impl FetchSummary {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a symbol resolved from the cache without any network call.
    pub(crate) fn record_cache_hit(&mut self, quote: Quote) {
        self.hits += 1;
        self.outcomes
            .insert(quote.symbol.clone(), FetchOutcome::Success(quote));
    }

    /// Record the outcome of a network fetch.
    pub(crate) fn record_fetched(&mut self, symbol: Symbol, outcome: FetchOutcome) {
        self.misses += 1;
        if !outcome.is_success() {
            self.failures += 1;
        }
        self.outcomes.insert(symbol, outcome);
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&FetchOutcome> {
        self.outcomes.get(symbol)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&Symbol, &FetchOutcome)> {
        self.outcomes.iter()
    }

    /// Successfully resolved quotes, cache hits included.
    pub fn successes(&self) -> impl Iterator<Item = &Quote> {
        self.outcomes.values().filter_map(FetchOutcome::quote)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Symbols resolved from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Symbols that required a network fetch.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Symbols whose outcome is a failure.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str) -> Quote {
        Quote::new(Symbol::new(symbol), dec!(100), "TEST", Utc::now())
    }

    #[test]
    fn test_summary_counters() {
        let mut summary = FetchSummary::new();
        summary.record_cache_hit(quote("AAA"));
        summary.record_fetched(Symbol::new("BBB"), FetchOutcome::Success(quote("BBB")));
        summary.record_fetched(
            Symbol::new("CCC"),
            FetchOutcome::Failure(FetchError::Cancelled),
        );

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.hits(), 1);
        assert_eq!(summary.misses(), 2);
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.successes().count(), 2);
    }

    #[test]
    fn test_one_outcome_per_symbol() {
        let mut summary = FetchSummary::new();
        summary.record_cache_hit(quote("AAA"));

        assert!(summary.get(&Symbol::new("AAA")).is_some());
        assert!(summary.get(&Symbol::new("ZZZ")).is_none());
    }

    #[test]
    fn test_outcome_accessors() {
        let success = FetchOutcome::Success(quote("AAA"));
        assert!(success.is_success());
        assert!(success.quote().is_some());
        assert!(success.error().is_none());

        let failure = FetchOutcome::Failure(FetchError::Cancelled);
        assert!(!failure.is_success());
        assert!(failure.quote().is_none());
        assert!(failure.error().is_some());
    }
}
