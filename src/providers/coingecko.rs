//! CoinGecko price provider implementation

use crate::{
    constants::{
        COINGECKO_API_KEY_HEADER, COINGECKO_API_URL, COINGECKO_SIMPLE_PRICE_ENDPOINT,
        REQUEST_TIMEOUT_SECS,
    },
    error::ProviderError,
    provider::QuoteProvider,
    providers::http_client,
    types::{Asset, Quote, QuoteBatch, QuoteSource},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, CoinGeckoPriceData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPriceData {
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

/// CoinGecko price provider (primary source)
///
/// Answers the whole basket with one batched request.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider against the public API
    pub fn new(api_key: Option<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(COINGECKO_API_URL, api_key)
    }

    /// Creates a provider against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Overrides the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    /// Builds the CoinGecko API URL for fetching prices
    fn build_url(&self, assets: &[Asset]) -> String {
        let ids = assets
            .iter()
            .map(|a| a.coingecko_id())
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "{}{}?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url, COINGECKO_SIMPLE_PRICE_ENDPOINT, ids
        )
    }

    /// Parses the CoinGecko response into quotes
    fn parse_response(&self, response: CoinGeckoResponse, assets: &[Asset]) -> QuoteBatch {
        let mut result = QuoteBatch::new();

        for asset in assets {
            let Some(price_data) = response.prices.get(asset.coingecko_id()) else {
                continue;
            };
            let Some(usd) = price_data.usd else {
                continue;
            };
            let change = price_data.usd_24h_change.unwrap_or(0.0);

            match Quote::new(usd, change, self.source()) {
                Some(quote) => {
                    result.insert(*asset, quote);
                }
                None => tracing::debug!(asset = %asset, price = usd, "Discarding invalid price"),
            }
        }

        result
    }
}

#[async_trait]
impl QuoteProvider for CoinGeckoProvider {
    async fn try_fetch(&self, assets: &[Asset]) -> Result<QuoteBatch, ProviderError> {
        if assets.is_empty() {
            return Ok(QuoteBatch::new());
        }

        let url = self.build_url(assets);
        tracing::debug!(url = %url, "Fetching prices from CoinGecko");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(COINGECKO_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(ProviderError::from_request)?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::from_request)?;

        let coingecko_response: CoinGeckoResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                ProviderError::InvalidResponse(format!(
                    "Failed to parse CoinGecko response: {}. Response: {}",
                    e, response_text
                ))
            })?;

        let quotes = self.parse_response(coingecko_response, assets);

        if quotes.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No prices returned from CoinGecko".to_string(),
            ));
        }

        tracing::info!(
            count = quotes.len(),
            requested = assets.len(),
            "Fetched prices from CoinGecko"
        );

        Ok(quotes)
    }

    fn source(&self) -> QuoteSource {
        QuoteSource::Primary
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::unresponsive_server;
    use mockito::Matcher;

    const ASSETS: &[Asset] = &[Asset::BTC, Asset::ETH, Asset::MATIC];

    #[tokio::test]
    async fn test_fetches_batched_quotes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "bitcoin,ethereum,matic-network".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
                Matcher::UrlEncoded("include_24hr_change".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"bitcoin":{"usd":65432.1,"usd_24h_change":3.2},
                    "ethereum":{"usd":3100.5,"usd_24h_change":-1.25}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let provider = CoinGeckoProvider::with_base_url(server.url(), None).unwrap();
        let quotes = provider.fetch_quotes(ASSETS).await;

        mock.assert_async().await;
        assert_eq!(quotes.len(), 2);
        let btc = &quotes[&Asset::BTC];
        assert_eq!(btc.price, 65432.1);
        assert_eq!(btc.change_24h, 3.2);
        assert_eq!(btc.source, QuoteSource::Primary);
        assert!(!quotes.contains_key(&Asset::MATIC));
    }

    #[tokio::test]
    async fn test_sends_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .match_header(COINGECKO_API_KEY_HEADER, "demo-key")
            .with_status(200)
            .with_body(r#"{"bitcoin":{"usd":1.5}}"#)
            .create_async()
            .await;

        let provider =
            CoinGeckoProvider::with_base_url(server.url(), Some("demo-key".to_string())).unwrap();
        let quotes = provider.fetch_quotes(&[Asset::BTC]).await;

        mock.assert_async().await;
        // Missing 24h change defaults to flat
        assert_eq!(quotes[&Asset::BTC].change_24h, 0.0);
    }

    #[tokio::test]
    async fn test_http_error_yields_empty_batch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let provider = CoinGeckoProvider::with_base_url(server.url(), None).unwrap();
        assert!(matches!(
            provider.try_fetch(ASSETS).await,
            Err(ProviderError::RateLimitExceeded)
        ));
        assert!(provider.fetch_quotes(ASSETS).await.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let provider = CoinGeckoProvider::with_base_url(server.url(), None).unwrap();
        match provider.try_fetch(ASSETS).await {
            Err(ProviderError::ApiError(msg)) => assert!(msg.contains("500")),
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert!(provider.fetch_quotes(ASSETS).await.is_empty());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let url = unresponsive_server().await;
        let provider = CoinGeckoProvider::with_base_url(url, None)
            .unwrap()
            .with_timeout(Duration::from_millis(200))
            .unwrap();

        assert!(matches!(
            provider.try_fetch(ASSETS).await,
            Err(ProviderError::Timeout)
        ));
        assert!(provider.fetch_quotes(ASSETS).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_yields_empty_batch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let provider = CoinGeckoProvider::with_base_url(server.url(), None).unwrap();
        assert!(provider.fetch_quotes(ASSETS).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_empty_batch() {
        let provider = CoinGeckoProvider::with_base_url("http://127.0.0.1:9", None).unwrap();
        assert!(provider.fetch_quotes(ASSETS).await.is_empty());
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let provider = CoinGeckoProvider::new(Some("  ".to_string())).unwrap();
        assert!(provider.api_key.is_none());
    }
}
