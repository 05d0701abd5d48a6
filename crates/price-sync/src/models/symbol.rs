use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized ticker identifier used as the cache and fetch key.
///
/// Symbols are trimmed and uppercased on construction; equality and
/// hashing operate on the normalized form only. Exchange suffixes
/// (e.g. `RELIANCE.NS`, `SHOP.TO`) are part of the symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from raw user or provider input.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// The normalized symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if nothing remained after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::new("  reliance.ns ").as_str(), "RELIANCE.NS");
        assert_eq!(Symbol::new("AAPL"), Symbol::new("aapl"));
    }

    #[test]
    fn test_symbol_empty_after_trim() {
        assert!(Symbol::new("   ").is_empty());
        assert!(!Symbol::new("TCS").is_empty());
    }

    #[test]
    fn test_symbol_display() {
        assert_eq!(format!("{}", Symbol::new("infy.ns")), "INFY.NS");
    }
}
