//! Scripted in-memory source for tests.
//!
//! A mock is an ordinary [`PriceSource`] registered into a chain like
//! any other; there is no global mock mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::errors::FetchError;
use crate::models::{Quote, Symbol};

use super::traits::PriceSource;

type Reply = dyn Fn(&Symbol, usize) -> Result<Decimal, FetchError> + Send + Sync;

/// A price source whose replies are scripted per (symbol, call number).
pub(crate) struct MockSource {
    name: &'static str,
    reply: Box<Reply>,
    delay: Duration,
    batch: bool,
    batch_omits: Vec<Symbol>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl MockSource {
    /// `reply` receives the symbol and the zero-based call number of
    /// this source and decides the price or error.
    pub(crate) fn new(
        name: &'static str,
        reply: impl Fn(&Symbol, usize) -> Result<Decimal, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            reply: Box::new(reply),
            delay: Duration::ZERO,
            batch: false,
            batch_omits: Vec::new(),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every call, to simulate a slow provider.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Advertise batch support.
    pub(crate) fn with_batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Leave these symbols out of batch responses (a partial map).
    pub(crate) fn with_batch_omits(mut self, omits: Vec<Symbol>) -> Self {
        self.batch_omits = omits;
        self
    }

    /// Total calls observed, batch calls counted once.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Instants at which calls arrived, for rate-limit spacing checks.
    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    fn stamp(&self) -> usize {
        self.call_times.lock().unwrap().push(Instant::now());
        self.calls.fetch_add(1, Ordering::SeqCst)
    }

    fn quote_for(&self, symbol: &Symbol, call: usize) -> Result<Quote, FetchError> {
        (self.reply)(symbol, call)
            .map(|price| Quote::new(symbol.clone(), price, self.name, Utc::now()))
    }
}

#[async_trait]
impl PriceSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let call = self.stamp();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.quote_for(symbol, call)
    }

    async fn fetch_many(&self, symbols: &[Symbol]) -> HashMap<Symbol, Result<Quote, FetchError>> {
        let call = self.stamp();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        symbols
            .iter()
            .filter(|symbol| !self.batch_omits.contains(*symbol))
            .map(|symbol| (symbol.clone(), self.quote_for(symbol, call)))
            .collect()
    }
}
