//! Binance price provider implementation

use crate::{
    constants::{
        BINANCE_API_URL, BINANCE_REQUEST_DELAY_MS, BINANCE_REQUEST_TIMEOUT_SECS,
        BINANCE_TICKER_ENDPOINT,
    },
    error::ProviderError,
    provider::QuoteProvider,
    providers::http_client,
    types::{Asset, Quote, QuoteBatch, QuoteSource},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

/// Binance 24h ticker statistics; numeric fields arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    last_price: String,
    price_change_percent: String,
}

/// Binance price provider (secondary source)
///
/// The ticker endpoint has no batch form, so each asset costs one request.
/// Requests are spaced by a fixed delay to stay under the rate limit.
pub struct BinanceProvider {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

impl BinanceProvider {
    /// Creates a new Binance provider against the public API
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(BINANCE_API_URL)
    }

    /// Creates a provider against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(Duration::from_secs(BINANCE_REQUEST_TIMEOUT_SECS))?,
            base_url: base_url.into(),
            request_delay: Duration::from_millis(BINANCE_REQUEST_DELAY_MS),
        })
    }

    /// Overrides the delay between per-asset requests
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Overrides the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    /// Fetches the 24h ticker for a single asset
    async fn fetch_ticker(&self, asset: Asset) -> Result<Quote, ProviderError> {
        let url = format!("{}{}", self.base_url, BINANCE_TICKER_ENDPOINT);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", asset.binance_symbol())])
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {} for {}",
                response.status(),
                asset.binance_symbol()
            )));
        }

        let ticker: TickerResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Binance ticker: {}", e))
        })?;

        let price = ticker.last_price.parse::<f64>().map_err(|_| {
            ProviderError::InvalidResponse(format!("Invalid lastPrice: {}", ticker.last_price))
        })?;
        let change = ticker.price_change_percent.parse::<f64>().map_err(|_| {
            ProviderError::InvalidResponse(format!(
                "Invalid priceChangePercent: {}",
                ticker.price_change_percent
            ))
        })?;

        Quote::new(price, change, self.source())
            .ok_or_else(|| ProviderError::InvalidResponse(format!("Invalid price: {}", price)))
    }
}

#[async_trait]
impl QuoteProvider for BinanceProvider {
    async fn try_fetch(&self, assets: &[Asset]) -> Result<QuoteBatch, ProviderError> {
        let mut result = QuoteBatch::new();
        let mut last_error = None;

        for (i, asset) in assets.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }

            match self.fetch_ticker(*asset).await {
                Ok(quote) => {
                    result.insert(*asset, quote);
                }
                Err(e) => {
                    tracing::debug!(asset = %asset, error = %e, "Binance ticker unavailable");
                    last_error = Some(e);
                }
            }
        }

        if result.is_empty() && !assets.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                ProviderError::InvalidResponse("No prices returned from Binance".to_string())
            }));
        }

        tracing::info!(
            count = result.len(),
            requested = assets.len(),
            "Fetched prices from Binance"
        );

        Ok(result)
    }

    fn source(&self) -> QuoteSource {
        QuoteSource::Secondary
    }

    fn provider_name(&self) -> &'static str {
        "binance"
    }
}
