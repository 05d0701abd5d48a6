//! Synchronization machinery: the engine facade and everything it
//! composes.
//!
//! - `rate_limiter` - Per-source minimum call spacing
//! - `retry` - Capped exponential backoff policy
//! - `circuit_breaker` - Per-source failure gate
//! - `cache` - Last-known-price store with lazy TTL
//! - `orchestrator` - Bounded-concurrency batch scheduling
//! - `config` / `engine` - Tuning knobs and the public facade

mod cache;
mod circuit_breaker;
mod config;
mod engine;
mod orchestrator;
mod rate_limiter;
mod retry;

pub use cache::{CacheEntry, CacheStore};
pub use circuit_breaker::CircuitBreaker;
pub use config::SyncConfig;
pub use engine::{HoldingsStore, PriceSyncEngine, QuoteState};
pub use orchestrator::BatchOrchestrator;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
