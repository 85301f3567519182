//! Price aggregator service
//!
//! Owns the cached snapshot and is the only component that refreshes it.
//! Interactive callers and the background scheduler share one instance.

use crate::{
    config::PriceServiceConfig,
    error::ProviderError,
    format::report_or_unavailable,
    metrics::{MetricsCollector, RefreshMetrics},
    provider::QuoteProvider,
    providers::{BinanceProvider, CoinGeckoProvider, FailoverProvider, FetchOutcome},
    store::PriceCacheStore,
    types::{Asset, CacheState, ComponentHealth, HealthStatus, PriceSnapshot},
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Cached, failover-backed price service
///
/// Reads inside the TTL window are served from memory. Refreshes are
/// single-flight: callers that queue behind a refresh in progress reuse its
/// result instead of issuing their own outbound requests.
///
/// # Example
/// ```no_run
/// use crypto_price_sdk::{PriceAggregator, PriceServiceConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let aggregator = PriceAggregator::from_config(&PriceServiceConfig::default()).await?;
/// let snapshot = aggregator.get_all_prices(false).await;
/// for (asset, quote) in snapshot.iter() {
///     println!("{}: ${:.2}", asset, quote.price);
/// }
/// println!("{}", aggregator.formatted_report().await);
/// # Ok(())
/// # }
/// ```
pub struct PriceAggregator {
    providers: FailoverProvider,
    store: PriceCacheStore,
    assets: Vec<Asset>,
    ttl: Duration,
    state: RwLock<CacheState>,
    /// Serializes the check-fetch-persist sequence
    refresh_lock: Mutex<()>,
    /// Number of completed refresh attempts
    refresh_attempts: AtomicU64,
    metrics: MetricsCollector,
}

impl PriceAggregator {
    /// Creates an aggregator with the CoinGecko/Binance failover pair
    ///
    /// The persisted cache is loaded before returning; a missing or corrupt
    /// cache file leaves the aggregator empty rather than failing.
    pub async fn from_config(config: &PriceServiceConfig) -> Result<Self, ProviderError> {
        let primary = Arc::new(CoinGeckoProvider::new(config.coingecko_api_key.clone())?);
        let secondary = Arc::new(BinanceProvider::new()?);

        Ok(Self::with_providers(
            primary,
            secondary,
            PriceCacheStore::new(&config.data_dir),
            config.assets.clone(),
            config.cache_ttl,
        )
        .await)
    }

    /// Creates an aggregator from explicit parts
    ///
    /// This is primarily for testing with mock providers.
    pub async fn with_providers(
        primary: Arc<dyn QuoteProvider>,
        secondary: Arc<dyn QuoteProvider>,
        store: PriceCacheStore,
        assets: Vec<Asset>,
        ttl: Duration,
    ) -> Self {
        let state = store.load().await;

        Self {
            providers: FailoverProvider::new(primary, secondary),
            store,
            assets,
            ttl,
            state: RwLock::new(state),
            refresh_lock: Mutex::new(()),
            refresh_attempts: AtomicU64::new(0),
            metrics: MetricsCollector::new(),
        }
    }

    /// Gets prices for all tracked assets
    ///
    /// Serves the cached snapshot while it is within the TTL unless
    /// `force_update` is set. Otherwise refreshes from the primary provider,
    /// falling back to the secondary only if the primary answered nothing.
    /// When both fail the previous snapshot (possibly empty) is returned.
    pub async fn get_all_prices(&self, force_update: bool) -> PriceSnapshot {
        let observed = self.refresh_attempts.load(Ordering::Acquire);

        if !force_update {
            if let Some(snapshot) = self.fresh_snapshot(Utc::now()).await {
                tracing::debug!(count = snapshot.len(), "Serving cached prices");
                self.metrics.record_cache_hit().await;
                return snapshot;
            }
        }

        let _guard = self.refresh_lock.lock().await;

        if self.refresh_attempts.load(Ordering::Acquire) != observed {
            tracing::debug!("Reusing refresh completed while waiting");
            self.metrics.record_coalesced().await;
            return self.cached_snapshot().await;
        }

        let snapshot = self.refresh().await;
        self.refresh_attempts.fetch_add(1, Ordering::AcqRel);
        snapshot
    }

    /// Gets the price report as chat-ready Markdown
    ///
    /// Returns [`UNAVAILABLE_MESSAGE`](crate::format::UNAVAILABLE_MESSAGE)
    /// when no prices are known at all.
    pub async fn formatted_report(&self) -> String {
        report_or_unavailable(&self.get_all_prices(false).await)
    }

    /// Forces a refresh and renders the snapshot it produced
    ///
    /// A failed refresh does not trigger a second fetch for the report.
    pub async fn refreshed_report(&self) -> String {
        report_or_unavailable(&self.get_all_prices(true).await)
    }

    /// Fetches from the providers and installs the result; caller holds the refresh lock
    async fn refresh(&self) -> PriceSnapshot {
        tracing::info!(assets = self.assets.len(), "Refreshing prices");
        let start = Instant::now();

        let outcome = self.providers.fetch(&self.assets).await;
        self.metrics
            .record_refresh(start.elapsed(), outcome.source())
            .await;

        match outcome {
            FetchOutcome::UsePrimary(quotes) | FetchOutcome::UseSecondary(quotes) => {
                let updated = {
                    let mut state = self.state.write().await;
                    state.replace(quotes, Utc::now());
                    state.clone()
                };

                tracing::info!(
                    count = updated.snapshot.len(),
                    source = ?updated.snapshot.dominant_source(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Prices refreshed"
                );

                if let Err(e) = self.store.save(&updated).await {
                    tracing::warn!(
                        path = %self.store.path().display(),
                        error = %e,
                        "Failed to persist price cache"
                    );
                    self.metrics.record_persist_failure().await;
                }

                updated.snapshot
            }
            FetchOutcome::UseCachedStale => {
                let snapshot = self.cached_snapshot().await;
                tracing::error!(
                    cached = snapshot.len(),
                    "Failed to fetch prices from any provider"
                );
                snapshot
            }
        }
    }

    /// Returns the cached snapshot if it is within the TTL and non-empty
    async fn fresh_snapshot(&self, now: DateTime<Utc>) -> Option<PriceSnapshot> {
        let state = self.state.read().await;
        if !state.snapshot.is_empty() && state.is_valid(now, self.ttl) {
            Some(state.snapshot.clone())
        } else {
            None
        }
    }

    /// Returns the cached snapshot without refreshing, regardless of age
    pub async fn cached_snapshot(&self) -> PriceSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Time of the last successful refresh
    pub async fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_updated_at
    }

    /// Assets fetched on every refresh
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Gets refresh metrics including latency percentiles and outcome counts
    pub async fn refresh_metrics(&self) -> RefreshMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the price cache
    ///
    /// # Returns
    /// Healthy with a fresh cache, Degraded with stale data, Unhealthy with none
    pub async fn health_check(&self) -> ComponentHealth {
        let now = Utc::now();
        let state = self.state.read().await.clone();
        let metrics = self.refresh_metrics().await;
        let mut details = std::collections::HashMap::new();

        details.insert(
            "available_prices".to_string(),
            serde_json::json!(state.snapshot.len()),
        );
        details.insert(
            "tracked_assets".to_string(),
            serde_json::json!(self.assets.len()),
        );
        details.insert(
            "providers".to_string(),
            serde_json::json!(self.providers.provider_names()),
        );
        details.insert(
            "cache_age_secs".to_string(),
            serde_json::json!(state.age(now).map(|age| age.as_secs())),
        );
        details.insert(
            "refresh_success_rate".to_string(),
            serde_json::json!(metrics.success_rate()),
        );

        let missing: Vec<&str> = self
            .assets
            .iter()
            .filter(|asset| state.snapshot.get(**asset).is_none())
            .map(|asset| asset.symbol())
            .collect();
        details.insert("missing_assets".to_string(), serde_json::json!(missing));

        let status = if state.snapshot.is_empty() {
            HealthStatus::Unhealthy
        } else if !state.is_valid(now, self.ttl) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Price cache is fresh".to_string(),
            HealthStatus::Degraded => format!(
                "Price cache is stale ({} prices older than {}s)",
                state.snapshot.len(),
                self.ttl.as_secs()
            ),
            HealthStatus::Unhealthy => "No price data available".to_string(),
        };

        ComponentHealth {
            name: "price_aggregator".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: now,
        }
    }
}
