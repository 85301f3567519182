//! Constants for the crypto price service
//!
//! Compile-time defaults for the price service. Only the values exposed
//! through `config::BotConfig` can be overridden at runtime.

use crate::types::Asset;

/// How often the background task refreshes prices (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 60;

/// How long a cached snapshot is served without refreshing (in seconds)
pub const CACHE_TTL_SECS: u64 = 60;

/// HTTP request timeout for the primary provider (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout for each secondary provider request (in seconds)
pub const BINANCE_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Delay between consecutive per-asset Binance requests (in milliseconds)
pub const BINANCE_REQUEST_DELAY_MS: u64 = 100;

/// Assets tracked by default
pub const DEFAULT_ASSETS: &[Asset] = &Asset::ALL;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// Header carrying the optional CoinGecko demo API key
pub const COINGECKO_API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Binance API base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Binance API endpoint for 24h ticker statistics
pub const BINANCE_TICKER_ENDPOINT: &str = "/ticker/24hr";

/// Directory holding the persisted cache, created on first save
pub const DEFAULT_DATA_DIR: &str = "data";

/// File name of the persisted cache inside the data directory
pub const CACHE_FILE_NAME: &str = "crypto_cache.json";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "crypto-price-bot/0.1.0";
