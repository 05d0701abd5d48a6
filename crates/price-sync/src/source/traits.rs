//! Price source trait definition.
//!
//! Implement [`PriceSource`] to add support for a new market data
//! provider. The chain uses the source's name for rate limiting,
//! circuit breaking, and quote provenance.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::{Quote, Symbol};

/// A pluggable provider of price quotes.
///
/// Sources translate their provider's request/response shape into the
/// canonical [`Quote`]/[`FetchError`] model at this boundary; nothing
/// above the trait knows about wire formats.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use sharefolio_price_sync::{FetchError, PriceSource, Quote, Symbol};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl PriceSource for MyProvider {
///     fn name(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
///         // call the provider, map its response and errors
///         # unimplemented!()
///     }
/// }
/// ```
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Unique identifier for this source.
    ///
    /// Should be a constant string like "YAHOO" or "NSE". Used for
    /// logging, rate limiting, circuit breaker tracking, and the
    /// `source_name` field of produced quotes.
    fn name(&self) -> &'static str;

    /// Whether [`fetch_many`](Self::fetch_many) is a genuine batch
    /// transport rather than the sequential default. The orchestrator
    /// only issues batch pre-passes to sources that return true.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Fetch the current quote for one symbol.
    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, FetchError>;

    /// Fetch quotes for several symbols in one call.
    ///
    /// The returned map may be partial; symbols missing from it are
    /// treated as failed for this call only, never as a batch-wide
    /// failure. The default implementation loops [`fetch_one`](Self::fetch_one).
    async fn fetch_many(&self, symbols: &[Symbol]) -> HashMap<Symbol, Result<Quote, FetchError>> {
        let mut results = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            results.insert(symbol.clone(), self.fetch_one(symbol).await);
        }
        results
    }
}
