//! Sharefolio Price Sync Crate
//!
//! This crate provides the price synchronization engine for the
//! Sharefolio application: given the set of symbols currently held, it
//! obtains current prices from unreliable, rate-limited external data
//! providers under a freshness policy, with bounded concurrency,
//! partial-failure tolerance, and retry/backoff, without blocking the
//! caller.
//!
//! # Overview
//!
//! The engine supports:
//! - Multiple sources (Yahoo Finance, NSE India, ...) in an ordered
//!   fallback chain
//! - Per-source rate limiting and circuit breaking
//! - A last-known-price cache with lazy TTL, never evicted
//! - Cancellable, bounded-concurrency batch refreshes
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  PriceSyncEngine |  refresh / get_cached / quote_state
//! +------------------+
//!          |
//!          v
//! +--------------------+     +------------+
//! |  BatchOrchestrator | --> | CacheStore |  (fresh hits short-circuit)
//! +--------------------+     +------------+
//!          |                       ^
//!          v                       | (successes written back)
//! +------------------+             |
//! |   SourceChain    | ------------+
//! +------------------+
//!   |  rate-limited, retried, breaker-gated
//!   v
//! +------------------+
//! |   PriceSource    |  (Yahoo, NSE, ...)
//! +------------------+
//! ```
//!
//! Every failure is scoped to its symbol: one symbol failing never
//! changes another symbol's outcome, and nothing short of a
//! construction error aborts a refresh.
//!
//! # Core Types
//!
//! - [`Symbol`] - Normalized ticker identifier
//! - [`Quote`] - Price observation with provenance
//! - [`FetchSummary`] / [`FetchOutcome`] - Per-call results
//! - [`PriceSource`] - Pluggable provider contract
//! - [`SyncConfig`] - Construction-time tuning knobs
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sharefolio_price_sync::{
//!     CancellationToken, PriceSyncEngine, Symbol, SyncConfig, YahooSource,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let yahoo = Arc::new(YahooSource::new()?);
//! let engine = PriceSyncEngine::new(vec![yahoo], SyncConfig::default())?;
//!
//! let holdings = vec![Symbol::new("AAPL"), Symbol::new("RELIANCE.NS")];
//! let summary = engine
//!     .refresh(&holdings, false, CancellationToken::new())
//!     .await;
//!
//! for quote in summary.successes() {
//!     println!("{} = {} (from {})", quote.symbol, quote.price, quote.source_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod models;
pub mod source;
pub mod sync;

// Re-export all public types from models
pub use models::{FetchOutcome, FetchSummary, Quote, Symbol};

// Re-export error types
pub use errors::{EngineError, FetchError, RetryClass};

// Re-export source types
pub use source::{NseSource, PriceSource, SourceChain, YahooSource};

// Re-export engine types
pub use sync::{
    BatchOrchestrator, CacheEntry, CacheStore, CircuitBreaker, HoldingsStore, PriceSyncEngine,
    QuoteState, RateLimiter, RetryPolicy, SyncConfig,
};

// The cancellation primitive callers hand to `refresh`.
pub use tokio_util::sync::CancellationToken;
