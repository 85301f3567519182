//! Types for the crypto price service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Supported cryptocurrency assets
///
/// Declaration order is the display order of every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    /// Bitcoin
    BTC,
    /// Ethereum
    ETH,
    /// Cardano
    ADA,
    /// Solana
    SOL,
    /// XRP
    XRP,
    /// Polkadot
    DOT,
    /// Dogecoin
    DOGE,
    /// Litecoin
    LTC,
    /// Chainlink
    LINK,
    /// Polygon
    MATIC,
}

impl Asset {
    /// Get the ticker symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::BTC => "BTC",
            Asset::ETH => "ETH",
            Asset::ADA => "ADA",
            Asset::SOL => "SOL",
            Asset::XRP => "XRP",
            Asset::DOT => "DOT",
            Asset::DOGE => "DOGE",
            Asset::LTC => "LTC",
            Asset::LINK => "LINK",
            Asset::MATIC => "MATIC",
        }
    }

    /// Get the CoinGecko ID for this asset
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Asset::BTC => "bitcoin",
            Asset::ETH => "ethereum",
            Asset::ADA => "cardano",
            Asset::SOL => "solana",
            Asset::XRP => "ripple",
            Asset::DOT => "polkadot",
            Asset::DOGE => "dogecoin",
            Asset::LTC => "litecoin",
            Asset::LINK => "chainlink",
            Asset::MATIC => "matic-network",
        }
    }

    /// Get the Binance USDT trading pair for this asset
    pub fn binance_symbol(&self) -> String {
        format!("{}USDT", self.symbol())
    }

    /// Every supported asset, in display order
    pub const ALL: [Asset; 10] = [
        Asset::BTC,
        Asset::ETH,
        Asset::ADA,
        Asset::SOL,
        Asset::XRP,
        Asset::DOT,
        Asset::DOGE,
        Asset::LTC,
        Asset::LINK,
        Asset::MATIC,
    ];

    /// Get all supported assets
    pub fn all() -> &'static [Asset] {
        &Self::ALL
    }

    /// Looks up an asset by its ticker symbol (case-insensitive)
    pub fn from_symbol(symbol: &str) -> Option<Asset> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.symbol().eq_ignore_ascii_case(symbol))
    }

    /// Looks up an asset by its CoinGecko ID
    pub fn from_coingecko_id(id: &str) -> Option<Asset> {
        Self::all().iter().copied().find(|a| a.coingecko_id() == id)
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which adapter produced a quote
///
/// Serialized with the provider's display label, which is also the format
/// of the persisted cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuoteSource {
    #[serde(rename = "CoinGecko")]
    Primary,
    #[serde(rename = "Binance")]
    Secondary,
}

impl QuoteSource {
    /// Human-readable provider label
    pub fn label(&self) -> &'static str {
        match self {
            QuoteSource::Primary => "CoinGecko",
            QuoteSource::Secondary => "Binance",
        }
    }
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single price quote for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Price in USD, never negative
    pub price: f64,

    /// 24h price change percentage
    pub change_24h: f64,

    /// Adapter that produced the quote
    pub source: QuoteSource,
}

impl Quote {
    /// Creates a quote, rejecting negative or non-finite prices
    ///
    /// Negative zero is stored as zero.
    pub fn new(price: f64, change_24h: f64, source: QuoteSource) -> Option<Self> {
        if !price.is_finite() || price < 0.0 {
            return None;
        }

        Some(Self {
            price: price + 0.0,
            change_24h: if change_24h.is_finite() { change_24h } else { 0.0 },
            source,
        })
    }
}

/// Quotes returned by one adapter call, keyed by asset
pub type QuoteBatch = BTreeMap<Asset, Quote>;

/// The complete set of quotes captured at one refresh instant
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    quotes: QuoteBatch,
    captured_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Creates a snapshot from a batch of quotes
    pub fn new(quotes: QuoteBatch, captured_at: DateTime<Utc>) -> Self {
        Self {
            quotes,
            captured_at,
        }
    }

    /// A snapshot with no quotes
    pub fn empty() -> Self {
        Self::new(QuoteBatch::new(), DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn quotes(&self) -> &QuoteBatch {
        &self.quotes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, asset: Asset) -> Option<&Quote> {
        self.quotes.get(&asset)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Iterates quotes in asset display order
    pub fn iter(&self) -> impl Iterator<Item = (&Asset, &Quote)> {
        self.quotes.iter()
    }

    /// Sources present in the snapshot, primary first
    pub fn sources(&self) -> Vec<QuoteSource> {
        let mut sources: Vec<QuoteSource> = self.quotes.values().map(|q| q.source).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// True when quotes from more than one adapter are present
    pub fn is_mixed(&self) -> bool {
        self.sources().len() > 1
    }

    /// The source that produced most quotes
    ///
    /// Ties resolve to the primary source. `None` for an empty snapshot.
    pub fn dominant_source(&self) -> Option<QuoteSource> {
        let primary = self
            .quotes
            .values()
            .filter(|q| q.source == QuoteSource::Primary)
            .count();
        let secondary = self.quotes.len() - primary;

        match (primary, secondary) {
            (0, 0) => None,
            (p, s) if p >= s => Some(QuoteSource::Primary),
            _ => Some(QuoteSource::Secondary),
        }
    }
}

/// Cached snapshot plus the time of the last successful refresh
#[derive(Debug, Clone, PartialEq)]
pub struct CacheState {
    pub snapshot: PriceSnapshot,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl CacheState {
    /// State with no quotes and no refresh recorded
    pub fn empty() -> Self {
        Self {
            snapshot: PriceSnapshot::empty(),
            last_updated_at: None,
        }
    }

    /// Replaces the snapshot wholesale after a successful refresh
    pub fn replace(&mut self, quotes: QuoteBatch, now: DateTime<Utc>) {
        self.snapshot = PriceSnapshot::new(quotes, now);
        self.last_updated_at = Some(now);
    }

    /// True iff a refresh was recorded and it is younger than `ttl`
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Some(last) = self.last_updated_at else {
            return false;
        };

        match (now - last).to_std() {
            Ok(age) => age < ttl,
            // Refresh stamped in the future (clock moved backwards)
            Err(_) => true,
        }
    }

    /// Age of the cached snapshot, if any refresh was recorded
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_updated_at
            .map(|last| (now - last).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Default for CacheState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Overall service health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Cache is fresh
    Healthy,
    /// Cache holds data older than the TTL
    Degraded,
    /// No price data at all
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
