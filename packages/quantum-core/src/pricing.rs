//! USD conversion for fee and gas display
//!
//! Values produced here are advisory only and never feed settlement math.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, Result as EyreResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::interfaces::RateSource;

/// Default exchange-rate endpoint (queried with `?currency=SYMBOL`)
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.coinbase.com/v2/exchange-rates";

/// Quote currency the rate table is read in
const QUOTE_CURRENCY: &str = "USDT";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    data: RatesData,
}

#[derive(Debug, Deserialize)]
struct RatesData {
    rates: HashMap<String, String>,
}

/// Exchange-rate table served over HTTP
pub struct CoinbaseRates {
    client: Client,
    base_url: String,
}

impl CoinbaseRates {
    pub fn new(base_url: impl Into<String>) -> EyreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RateSource for CoinbaseRates {
    async fn usd_rate(&self, symbol: &str) -> EyreResult<f64> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("currency", symbol)])
            .send()
            .await
            .map_err(|e| eyre!("Exchange-rate request failed: {}", e))?
            .error_for_status()
            .map_err(|e| eyre!("Exchange-rate service returned error: {}", e))?;

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Invalid exchange-rate response: {}", e))?;

        let rate = body
            .data
            .rates
            .get(QUOTE_CURRENCY)
            .ok_or_else(|| eyre!("No {} rate for {}", QUOTE_CURRENCY, symbol))?;

        rate.parse::<f64>()
            .map_err(|e| eyre!("Unparseable rate {:?} for {}: {}", rate, symbol, e))
    }
}

/// Converts native-asset amounts to a two-decimal USD string
#[derive(Clone)]
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    /// `amount` (human-readable) of `symbol` expressed in USD, e.g. `"12.34"`
    pub async fn to_usd(&self, amount: &str, symbol: &str) -> Result<String> {
        let value: f64 = amount
            .trim()
            .parse()
            .map_err(|_| Error::PriceUnavailable(format!("not a number: {:?}", amount)))?;

        let rate = self.source.usd_rate(symbol).await.map_err(|e| {
            warn!(symbol = %symbol, error = %e, "Exchange rate lookup failed");
            Error::PriceUnavailable(e.to_string())
        })?;

        let usd = format!("{:.2}", value * rate);
        debug!(amount = %amount, symbol = %symbol, rate, usd = %usd, "Converted to USD");
        Ok(usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRate(f64);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn usd_rate(&self, _symbol: &str) -> EyreResult<f64> {
            Ok(self.0)
        }
    }

    struct DownRate;

    #[async_trait]
    impl RateSource for DownRate {
        async fn usd_rate(&self, symbol: &str) -> EyreResult<f64> {
            Err(eyre!("no route to host for {}", symbol))
        }
    }

    #[tokio::test]
    async fn test_to_usd_two_decimals() {
        let converter = CurrencyConverter::new(Arc::new(FixedRate(2500.0)));
        assert_eq!(converter.to_usd("0.001", "ETH").await.unwrap(), "2.50");
        assert_eq!(converter.to_usd("0", "ETH").await.unwrap(), "0.00");
    }

    #[tokio::test]
    async fn test_rate_failure_propagates() {
        let converter = CurrencyConverter::new(Arc::new(DownRate));
        let err = converter.to_usd("1", "ARB").await.unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_numeric_amount() {
        let converter = CurrencyConverter::new(Arc::new(FixedRate(1.0)));
        assert!(converter.to_usd("abc", "ETH").await.is_err());
    }

    #[test]
    fn test_rates_response_shape() {
        let json = r#"{"data":{"currency":"ETH","rates":{"USD":"2501.1","USDT":"2500.5"}}}"#;
        let parsed: RatesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.rates.get("USDT").unwrap(), "2500.5");
    }
}
