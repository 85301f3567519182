//! Primary/secondary failover between quote providers

use crate::{
    provider::QuoteProvider,
    types::{Asset, QuoteBatch, QuoteSource},
};
use std::sync::Arc;

/// Result of one refresh attempt across both providers
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The primary answered at least one asset
    UsePrimary(QuoteBatch),
    /// The primary answered nothing and the secondary answered something
    UseSecondary(QuoteBatch),
    /// Neither provider answered; keep serving the cached snapshot
    UseCachedStale,
}

impl FetchOutcome {
    /// The batch to install in the cache, if any
    pub fn into_quotes(self) -> Option<QuoteBatch> {
        match self {
            FetchOutcome::UsePrimary(quotes) | FetchOutcome::UseSecondary(quotes) => Some(quotes),
            FetchOutcome::UseCachedStale => None,
        }
    }

    /// Which provider the outcome came from
    pub fn source(&self) -> Option<QuoteSource> {
        match self {
            FetchOutcome::UsePrimary(_) => Some(QuoteSource::Primary),
            FetchOutcome::UseSecondary(_) => Some(QuoteSource::Secondary),
            FetchOutcome::UseCachedStale => None,
        }
    }
}

/// True when the primary's answer is empty and the secondary must be asked
pub fn needs_fallback(primary: &QuoteBatch) -> bool {
    primary.is_empty()
}

/// Chooses between the primary and secondary answers
///
/// Any non-empty primary answer wins, even a partial one. `secondary` is
/// `None` when the secondary was not consulted.
pub fn select_outcome(primary: QuoteBatch, secondary: Option<QuoteBatch>) -> FetchOutcome {
    if !needs_fallback(&primary) {
        return FetchOutcome::UsePrimary(primary);
    }

    match secondary {
        Some(quotes) if !quotes.is_empty() => FetchOutcome::UseSecondary(quotes),
        _ => FetchOutcome::UseCachedStale,
    }
}

/// Runs the primary provider, then the secondary only if the primary was empty
pub struct FailoverProvider {
    primary: Arc<dyn QuoteProvider>,
    secondary: Arc<dyn QuoteProvider>,
}

impl FailoverProvider {
    /// Creates a failover pair
    pub fn new(primary: Arc<dyn QuoteProvider>, secondary: Arc<dyn QuoteProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Fetches the full asset set, falling back when the primary is empty
    pub async fn fetch(&self, assets: &[Asset]) -> FetchOutcome {
        let primary = self.primary.fetch_quotes(assets).await;

        if !needs_fallback(&primary) {
            return select_outcome(primary, None);
        }

        tracing::info!(
            primary = self.primary.provider_name(),
            secondary = self.secondary.provider_name(),
            "Primary provider returned nothing, falling back"
        );

        let secondary = self.secondary.fetch_quotes(assets).await;
        select_outcome(primary, Some(secondary))
    }

    /// Names of the configured providers, primary first
    pub fn provider_names(&self) -> [&'static str; 2] {
        [self.primary.provider_name(), self.secondary.provider_name()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::types::Quote;

    fn batch(assets: &[Asset], source: QuoteSource) -> QuoteBatch {
        assets
            .iter()
            .map(|a| (*a, Quote::new(1.0, 0.0, source).unwrap()))
            .collect()
    }

    #[test]
    fn test_select_outcome() {
        let primary = batch(&[Asset::BTC], QuoteSource::Primary);
        let secondary = batch(&[Asset::BTC, Asset::ETH], QuoteSource::Secondary);

        assert_eq!(
            select_outcome(primary.clone(), Some(secondary.clone())),
            FetchOutcome::UsePrimary(primary)
        );
        assert_eq!(
            select_outcome(QuoteBatch::new(), Some(secondary.clone())),
            FetchOutcome::UseSecondary(secondary)
        );
        assert_eq!(
            select_outcome(QuoteBatch::new(), Some(QuoteBatch::new())),
            FetchOutcome::UseCachedStale
        );
        assert_eq!(
            select_outcome(QuoteBatch::new(), None),
            FetchOutcome::UseCachedStale
        );
    }

    #[tokio::test]
    async fn test_partial_primary_suppresses_secondary() {
        let primary = Arc::new(MockProvider::new(QuoteSource::Primary));
        let secondary = Arc::new(MockProvider::new(QuoteSource::Secondary));
        primary.set_price(Asset::BTC, 100.0, 1.0);
        secondary.set_prices(Asset::all(), 1.0);

        let failover = FailoverProvider::new(primary.clone(), secondary.clone());
        let outcome = failover.fetch(Asset::all()).await;

        assert_eq!(outcome.source(), Some(QuoteSource::Primary));
        assert_eq!(outcome.into_quotes().unwrap().len(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_back_for_full_set() {
        let primary = Arc::new(MockProvider::new(QuoteSource::Primary));
        let secondary = Arc::new(MockProvider::new(QuoteSource::Secondary));
        secondary.set_prices(&[Asset::ETH, Asset::SOL], 10.0);

        let failover = FailoverProvider::new(primary.clone(), secondary.clone());
        let outcome = failover.fetch(Asset::all()).await;

        assert_eq!(outcome.source(), Some(QuoteSource::Secondary));
        assert_eq!(secondary.requested(), vec![Asset::all().to_vec()]);
        assert_eq!(failover.provider_names(), ["mock", "mock"]);
    }
}
