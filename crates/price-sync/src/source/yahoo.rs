//! Yahoo Finance price source.
//!
//! Fetches the latest close for equities, ETFs, crypto pairs and FX
//! symbols through the Yahoo Finance chart API. Symbols use Yahoo's
//! own suffix conventions (e.g. `SHOP.TO`, `RELIANCE.NS`, `BTC-USD`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;
use yahoo_finance_api as yahoo;

use crate::errors::{EngineError, FetchError};
use crate::models::{Quote, Symbol};

use super::traits::PriceSource;

const SOURCE_NAME: &str = "YAHOO";

/// Yahoo Finance price source.
pub struct YahooSource {
    connector: yahoo::YahooConnector,
}

impl YahooSource {
    /// Create a new Yahoo Finance source.
    pub fn new() -> Result<Self, EngineError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| EngineError::SourceInit {
            source_name: SOURCE_NAME.to_string(),
            message: format!("failed to initialize Yahoo connector: {}", e),
        })?;
        Ok(Self { connector })
    }

    fn map_error(symbol: &Symbol, error: yahoo::YahooError) -> FetchError {
        match error {
            yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => FetchError::NotFound {
                symbol: symbol.clone(),
            },
            other => FetchError::Transient {
                source_name: SOURCE_NAME.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        debug!("fetching latest quote for {} from Yahoo", symbol);

        let response = self
            .connector
            .get_latest_quotes(symbol.as_str(), "1d")
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        let last = response
            .last_quote()
            .map_err(|e| Self::map_error(symbol, e))?;

        let price = Decimal::from_f64(last.close).ok_or_else(|| FetchError::Transient {
            source_name: SOURCE_NAME.to_string(),
            message: format!("unrepresentable close price {} for {}", last.close, symbol),
        })?;

        let observed_at = DateTime::<Utc>::from_timestamp(last.timestamp as i64, 0)
            .unwrap_or_else(Utc::now);

        Ok(Quote::new(symbol.clone(), price, SOURCE_NAME, observed_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_quotes_maps_to_not_found() {
        let symbol = Symbol::new("ZZZ");
        let error = YahooSource::map_error(&symbol, yahoo::YahooError::NoQuotes);
        assert!(matches!(error, FetchError::NotFound { .. }));
    }
}
