use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// A price observation with provenance.
///
/// Quotes are produced only by a successful fetch and are never
/// partially constructed; `price` is expected to be positive (the
/// source chain rejects non-positive prices before they reach here).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol the price was observed for.
    pub symbol: Symbol,

    /// Observed price.
    pub price: Decimal,

    /// Source that produced the observation (YAHOO, NSE, etc.).
    pub source_name: String,

    /// When the observation was made.
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: Decimal,
        source_name: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            price,
            source_name: source_name.into(),
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new() {
        let quote = Quote::new(Symbol::new("AAPL"), dec!(150.25), "YAHOO", Utc::now());
        assert_eq!(quote.symbol.as_str(), "AAPL");
        assert_eq!(quote.price, dec!(150.25));
        assert_eq!(quote.source_name, "YAHOO");
    }
}
