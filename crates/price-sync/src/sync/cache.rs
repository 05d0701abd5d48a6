//! Last-known-price cache with lazy TTL.
//!
//! Holds at most one entry per symbol. Entries are written only on a
//! successful fetch and never deleted; staleness is a query-time
//! property computed against `expires_at`, so stale values remain
//! available for display paths that prefer an old price over none.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::{Quote, Symbol};

/// A cached quote and the instant it stops being fresh.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub quote: Quote,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh iff `now < expires_at`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// Concurrent symbol→entry store with a fixed TTL.
///
/// Entry-level locking via `DashMap`; no operation blocks on another
/// symbol, and nothing sweeps in the background.
pub struct CacheStore {
    ttl: chrono::Duration,
    entries: DashMap<Symbol, CacheEntry>,
}

impl CacheStore {
    /// Create a store whose entries stay fresh for `ttl` after their
    /// observation time.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            entries: DashMap::new(),
        }
    }

    /// Read the entry for a symbol. Stale entries are returned as-is;
    /// the caller decides what staleness means.
    pub fn get(&self, symbol: &Symbol) -> Option<CacheEntry> {
        self.entries.get(symbol).map(|entry| entry.value().clone())
    }

    /// Store a quote, overwriting any previous entry for its symbol.
    pub fn put(&self, quote: Quote) {
        let expires_at = quote
            .observed_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let symbol = quote.symbol.clone();
        self.entries.insert(symbol, CacheEntry { quote, expires_at });
    }

    /// The last known quote for a symbol, fresh or stale.
    pub fn latest_quote(&self, symbol: &Symbol) -> Option<Quote> {
        self.get(symbol).map(|entry| entry.quote)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, observed_at: DateTime<Utc>) -> Quote {
        Quote::new(Symbol::new(symbol), dec!(100.5), "TEST", observed_at)
    }

    #[test]
    fn test_put_then_get() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache.put(quote("AAPL", Utc::now()));

        let entry = cache.get(&Symbol::new("AAPL")).unwrap();
        assert!(entry.is_fresh());
        assert_eq!(entry.quote.price, dec!(100.5));
    }

    #[test]
    fn test_miss() {
        let cache = CacheStore::new(Duration::from_secs(60));
        assert!(cache.get(&Symbol::new("MISSING")).is_none());
    }

    #[test]
    fn test_overwrite_keeps_one_entry_per_symbol() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache.put(quote("AAPL", Utc::now()));
        cache.put(Quote::new(
            Symbol::new("AAPL"),
            dec!(101.25),
            "TEST",
            Utc::now(),
        ));

        assert_eq!(cache.len(), 1);
        let entry = cache.get(&Symbol::new("AAPL")).unwrap();
        assert_eq!(entry.quote.price, dec!(101.25));
    }

    #[test]
    fn test_stale_entry_is_still_returned() {
        let cache = CacheStore::new(Duration::from_secs(60));
        let old = Utc::now() - chrono::Duration::seconds(300);
        cache.put(quote("AAPL", old));

        let entry = cache.get(&Symbol::new("AAPL")).unwrap();
        assert!(!entry.is_fresh());
        assert_eq!(entry.quote.price, dec!(100.5));
        assert_eq!(cache.latest_quote(&Symbol::new("AAPL")).unwrap().price, dec!(100.5));
    }

    #[test]
    fn test_expiry_is_observed_at_plus_ttl() {
        let cache = CacheStore::new(Duration::from_secs(60));
        let observed = Utc::now();
        cache.put(quote("AAPL", observed));

        let entry = cache.get(&Symbol::new("AAPL")).unwrap();
        assert_eq!(entry.expires_at, observed + chrono::Duration::seconds(60));
        assert!(entry.is_fresh_at(observed + chrono::Duration::seconds(59)));
        assert!(!entry.is_fresh_at(observed + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_concurrent_puts() {
        use std::sync::Arc;

        let cache = Arc::new(CacheStore::new(Duration::from_secs(60)));
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    cache.put(Quote::new(
                        Symbol::new(&format!("SYM{}", j)),
                        dec!(1) + rust_decimal::Decimal::from(i),
                        "TEST",
                        Utc::now(),
                    ));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 50);
    }
}
