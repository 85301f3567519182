//! Provider abstraction for fetching quotes from external price APIs

use crate::{
    error::ProviderError,
    types::{Asset, QuoteBatch, QuoteSource},
};
use async_trait::async_trait;

/// Trait for quote source adapters
///
/// Implementations call one external price API and normalize its reply into
/// [`Quote`](crate::types::Quote)s. They hold no price state of their own.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches quotes for the given assets
    ///
    /// Fails as a whole only when nothing could be answered. Assets the
    /// source does not know are simply left out of the batch.
    async fn try_fetch(&self, assets: &[Asset]) -> Result<QuoteBatch, ProviderError>;

    /// Returns which side of the failover pair this provider is
    fn source(&self) -> QuoteSource;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;

    /// Fetches quotes, downgrading any failure to an empty batch
    ///
    /// # Arguments
    /// * `assets` - Assets to fetch quotes for
    ///
    /// # Returns
    /// Every quote the source could answer; empty on failure
    async fn fetch_quotes(&self, assets: &[Asset]) -> QuoteBatch {
        match self.try_fetch(assets).await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider_name(),
                    error = %e,
                    "Provider unavailable"
                );
                QuoteBatch::new()
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::types::Quote;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock provider for testing
    pub struct MockProvider {
        source: QuoteSource,
        responses: Arc<Mutex<HashMap<Asset, Quote>>>,
        call_count: Arc<Mutex<usize>>,
        requested: Arc<Mutex<Vec<Vec<Asset>>>>,
        delay: Duration,
    }

    impl MockProvider {
        pub fn new(source: QuoteSource) -> Self {
            Self {
                source,
                responses: Arc::new(Mutex::new(HashMap::new())),
                call_count: Arc::new(Mutex::new(0)),
                requested: Arc::new(Mutex::new(Vec::new())),
                delay: Duration::ZERO,
            }
        }

        /// Delays every fetch, widening the window for concurrent callers
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn set_price(&self, asset: Asset, price: f64, change_24h: f64) {
            let quote = Quote::new(price, change_24h, self.source).unwrap();
            self.responses.lock().unwrap().insert(asset, quote);
        }

        pub fn set_prices(&self, assets: &[Asset], price: f64) {
            for asset in assets {
                self.set_price(*asset, price, 0.0);
            }
        }

        pub fn clear(&self) {
            self.responses.lock().unwrap().clear();
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        /// Asset lists of every call, in call order
        pub fn requested(&self) -> Vec<Vec<Asset>> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteProvider for MockProvider {
        async fn try_fetch(&self, assets: &[Asset]) -> Result<QuoteBatch, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.requested.lock().unwrap().push(assets.to_vec());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let responses = self.responses.lock().unwrap();
            let result: QuoteBatch = assets
                .iter()
                .filter_map(|asset| responses.get(asset).map(|q| (*asset, q.clone())))
                .collect();

            if result.is_empty() {
                Err(ProviderError::InvalidResponse(
                    "No prices available".to_string(),
                ))
            } else {
                Ok(result)
            }
        }

        fn source(&self) -> QuoteSource {
            self.source
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
