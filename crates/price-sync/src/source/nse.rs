//! NSE India price source.
//!
//! Fetches last traded prices from the National Stock Exchange of
//! India's public quote API. Accepts symbols with or without the `.NS`
//! suffix; the suffix is stripped before the request since the NSE API
//! uses bare scrip names.
//!
//! The API is unauthenticated but picky about request headers and
//! aggressive about rate limiting; 401/403 responses are treated as
//! transient blocks.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use num_traits::FromPrimitive;
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::errors::{EngineError, FetchError};
use crate::models::{Quote, Symbol};

use super::traits::PriceSource;

const BASE_URL: &str = "https://www.nseindia.com/api";
const SOURCE_NAME: &str = "NSE";

/// Browser-like agent string; the NSE API rejects the reqwest default.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from the /quote-equity endpoint, reduced to the fields we use.
#[derive(Debug, Deserialize)]
struct QuoteEquityResponse {
    #[serde(rename = "priceInfo")]
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
}

/// NSE India price source.
pub struct NseSource {
    client: Client,
}

impl NseSource {
    /// Create a new NSE source.
    pub fn new() -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EngineError::SourceInit {
                source_name: SOURCE_NAME.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    fn classify_status(symbol: &Symbol, response: &reqwest::Response) -> Option<FetchError> {
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Some(FetchError::NotFound {
                symbol: symbol.clone(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Some(FetchError::RateLimited {
                source_name: SOURCE_NAME.to_string(),
                retry_after: parse_retry_after(response.headers()),
            }),
            status if status.is_success() => None,
            status => Some(FetchError::Transient {
                source_name: SOURCE_NAME.to_string(),
                message: format!("unexpected status {}", status),
            }),
        }
    }
}

/// Strip the Yahoo-style `.NS` suffix; the NSE API wants bare scrips.
fn trim_nse_suffix(symbol: &Symbol) -> &str {
    symbol
        .as_str()
        .strip_suffix(".NS")
        .unwrap_or_else(|| symbol.as_str())
}

fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl PriceSource for NseSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let scrip = trim_nse_suffix(symbol);
        let url = format!("{}/quote-equity?symbol={}", BASE_URL, encode(scrip));

        debug!("fetching {} from NSE as '{}'", symbol, scrip);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    source_name: SOURCE_NAME.to_string(),
                }
            } else {
                FetchError::Transient {
                    source_name: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        if let Some(error) = Self::classify_status(symbol, &response) {
            warn!("NSE request for {} failed: {}", symbol, error);
            return Err(error);
        }

        let data: QuoteEquityResponse =
            response.json().await.map_err(|e| FetchError::Transient {
                source_name: SOURCE_NAME.to_string(),
                message: format!("failed to parse quote response: {}", e),
            })?;

        let last_price = data
            .price_info
            .and_then(|info| info.last_price)
            .ok_or_else(|| FetchError::NotFound {
                symbol: symbol.clone(),
            })?;

        let price = Decimal::from_f64(last_price).ok_or_else(|| FetchError::Transient {
            source_name: SOURCE_NAME.to_string(),
            message: format!("unrepresentable last price {} for {}", last_price, symbol),
        })?;

        Ok(Quote::new(symbol.clone(), price, SOURCE_NAME, Utc::now()))
    }
}
