use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use moka::future::Cache;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::BackendError;

/// USD price source for event valuation.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Spot price when `at` is `None`, otherwise the daily price for the day
    /// containing `at` (unix seconds).
    async fn get_price(&self, symbol: &str, at: Option<i64>) -> Result<Decimal, BackendError>;
}

/// HTTP price service with a short-lived cache in front of it.
#[derive(Clone)]
pub struct SpotPriceService {
    client: Client,
    api_key: String,
    base_url: String,
    cache: Arc<Cache<String, Decimal>>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    usd: Decimal,
}

impl SpotPriceService {
    pub fn new(api_key: String, base_url: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            client: Client::new(),
            api_key,
            base_url,
            cache: Arc::new(cache),
        }
    }

    async fn fetch_price(&self, symbol: &str, date: Option<&str>) -> Result<Decimal, BackendError> {
        tracing::debug!("Fetching price for {} (date: {:?})", symbol, date);

        let url = format!("{}/prices/{}", self.base_url, symbol.to_lowercase());

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("x-api-key", &self.api_key);
        }
        if let Some(date) = date {
            request = request.query(&[("date", date)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Price {
                symbol: symbol.to_string(),
                reason: format!("price API error {}: {}", status, error_text),
            });
        }

        let data: PriceResponse = response.json().await.map_err(|e| BackendError::Price {
            symbol: symbol.to_string(),
            reason: format!("unexpected price payload: {e}"),
        })?;

        Ok(data.usd)
    }
}

#[async_trait]
impl PriceOracle for SpotPriceService {
    async fn get_price(&self, symbol: &str, at: Option<i64>) -> Result<Decimal, BackendError> {
        let date = at
            .map(|ts| {
                DateTime::from_timestamp(ts, 0)
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .ok_or_else(|| BackendError::Price {
                        symbol: symbol.to_string(),
                        reason: format!("timestamp {ts} out of range"),
                    })
            })
            .transpose()?;

        let cache_key = format!(
            "{}_{}",
            symbol.to_uppercase(),
            date.as_deref().unwrap_or("spot")
        );

        if let Some(price) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(price);
        }

        let price = self.fetch_price(symbol, date.as_deref()).await?;
        self.cache.insert(cache_key, price).await;

        Ok(price)
    }
}

/// Fixed-price oracle for tests and environments without a price API.
///
/// The default price stands in where no per-symbol entry exists, matching
/// the placeholder valuation the page shipped with before a real feed.
pub struct StaticPriceOracle {
    prices: HashMap<String, Decimal>,
    default_price: Decimal,
}

impl StaticPriceOracle {
    pub fn new(prices: HashMap<String, Decimal>, default_price: Decimal) -> Self {
        Self {
            prices,
            default_price,
        }
    }

    pub fn with_default(default_price: Decimal) -> Self {
        Self::new(HashMap::new(), default_price)
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn get_price(&self, symbol: &str, _at: Option<i64>) -> Result<Decimal, BackendError> {
        Ok(self
            .prices
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(self.default_price))
    }
}
