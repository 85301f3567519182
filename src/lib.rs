//! # Crypto Price SDK
//!
//! Cached cryptocurrency prices for chat bots, fetched from CoinGecko with
//! Binance as fallback.
//!
//! The chat front end talks to one [`PriceAggregator`] through two calls:
//! [`PriceAggregator::get_all_prices`] and [`PriceAggregator::formatted_report`].
//! A [`RefreshScheduler`] keeps the cache warm in the background.
//!
//! ## Usage
//!
//! ```no_run
//! use crypto_price_sdk::{PriceAggregator, PriceServiceConfig, RefreshScheduler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PriceServiceConfig::default();
//! let aggregator = Arc::new(PriceAggregator::from_config(&config).await?);
//! let scheduler = RefreshScheduler::spawn(aggregator.clone(), config.refresh_interval);
//!
//! println!("{}", aggregator.formatted_report().await);
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! RefreshScheduler (every 60s)     chat handlers
//!               \                  /
//!                PriceAggregator (TTL cache, single-flight refresh)
//!                 /                \
//!   FailoverProvider               PriceCacheStore
//!   CoinGecko -> Binance           data/crypto_cache.json
//! ```
//!
//! ## Failure handling
//!
//! Nothing in the read path returns an error. Provider failures degrade to
//! empty batches, a failed refresh keeps serving the last snapshot, and a
//! broken cache file means starting empty. When no prices are known at all
//! the report is [`format::UNAVAILABLE_MESSAGE`].

pub mod aggregator;
pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use aggregator::PriceAggregator;
pub use config::{BotConfig, PriceServiceConfig};
pub use error::{CacheError, ConfigError, ProviderError};
pub use metrics::RefreshMetrics;
pub use provider::QuoteProvider;
pub use providers::FetchOutcome;
pub use scheduler::RefreshScheduler;
pub use store::PriceCacheStore;
pub use types::{
    Asset, CacheState, ComponentHealth, HealthStatus, PriceSnapshot, Quote, QuoteSource,
};
