//! Runtime configuration
//!
//! Values come from the environment (optionally via a `.env` file); anything
//! unset falls back to the defaults in [`crate::constants`].

use crate::{
    constants::{CACHE_TTL_SECS, DEFAULT_ASSETS, DEFAULT_DATA_DIR, REFRESH_INTERVAL_SECS},
    error::ConfigError,
    types::Asset,
};
use std::path::PathBuf;
use std::time::Duration;

const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_DATA_DIR: &str = "PRICE_DATA_DIR";
const ENV_CACHE_TTL: &str = "PRICE_CACHE_TTL_SECS";
const ENV_REFRESH_INTERVAL: &str = "PRICE_REFRESH_INTERVAL_SECS";
const ENV_TRACKED_ASSETS: &str = "TRACKED_ASSETS";

/// Settings consumed by the price aggregator
#[derive(Debug, Clone)]
pub struct PriceServiceConfig {
    /// Optional CoinGecko demo API key
    pub coingecko_api_key: Option<String>,
    /// Assets fetched on every refresh, in display order
    pub assets: Vec<Asset>,
    /// Directory holding the persisted cache
    pub data_dir: PathBuf,
    /// Maximum age of a snapshot served without refreshing
    pub cache_ttl: Duration,
    /// Period of the background refresh task
    pub refresh_interval: Duration,
}

impl Default for PriceServiceConfig {
    fn default() -> Self {
        Self {
            coingecko_api_key: None,
            assets: DEFAULT_ASSETS.to_vec(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
        }
    }
}

/// Full bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Chat platform credential; required even though the core never uses it
    pub bot_token: String,
    pub price: PriceServiceConfig,
}

impl BotConfig {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get(ENV_BOT_TOKEN).ok_or(ConfigError::Missing(ENV_BOT_TOKEN))?;

        let mut price = PriceServiceConfig {
            coingecko_api_key: get(ENV_COINGECKO_API_KEY),
            ..PriceServiceConfig::default()
        };

        if let Some(dir) = get(ENV_DATA_DIR) {
            price.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(ENV_CACHE_TTL) {
            price.cache_ttl = parse_secs(ENV_CACHE_TTL, &raw)?;
        }
        if let Some(raw) = get(ENV_REFRESH_INTERVAL) {
            price.refresh_interval = parse_secs(ENV_REFRESH_INTERVAL, &raw)?;
        }
        if let Some(raw) = get(ENV_TRACKED_ASSETS) {
            price.assets = parse_assets(&raw)?;
        }

        Ok(Self { bot_token, price })
    }

    pub fn price_config(&self) -> &PriceServiceConfig {
        &self.price
    }
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Parses a comma-separated list of CoinGecko ids, keeping the canonical order
fn parse_assets(raw: &str) -> Result<Vec<Asset>, ConfigError> {
    let mut assets = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let asset = Asset::from_coingecko_id(id)
            .ok_or_else(|| ConfigError::UnknownAsset(id.to_string()))?;
        if !assets.contains(&asset) {
            assets.push(asset);
        }
    }

    if assets.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: ENV_TRACKED_ASSETS,
            value: raw.to_string(),
        });
    }

    assets.sort();
    Ok(assets)
}
