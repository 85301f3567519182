//! On-disk price cache
//!
//! Persists the last good snapshot as a flat JSON document so a restart can
//! serve prices before the first refresh completes:
//!
//! ```text
//! {
//!   "prices": { "BTC": { "price": 65432.1, "change_24h": 3.2, "source": "CoinGecko" } },
//!   "last_update": "2026-10-19T12:00:00Z"
//! }
//! ```

use crate::{
    constants::{CACHE_FILE_NAME, DEFAULT_DATA_DIR},
    error::CacheError,
    types::{Asset, CacheState, PriceSnapshot, Quote, QuoteBatch},
};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Serialize)]
struct CacheFileOut<'a> {
    prices: BTreeMap<&'static str, &'a Quote>,
    last_update: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CacheFileIn {
    #[serde(default)]
    prices: BTreeMap<String, Quote>,
    #[serde(default)]
    last_update: Option<String>,
}

/// True iff the state was refreshed less than `ttl` before `now`
pub fn is_valid(state: &CacheState, now: DateTime<Utc>, ttl: Duration) -> bool {
    state.is_valid(now, ttl)
}

/// Flat-file store for the cached snapshot
#[derive(Debug, Clone)]
pub struct PriceCacheStore {
    path: PathBuf,
}

impl PriceCacheStore {
    /// Store at `<data_dir>/crypto_cache.json`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted state
    ///
    /// Never fails: a missing or unreadable file yields an empty state.
    pub async fn load(&self) -> CacheState {
        match self.try_load().await {
            Ok(Some(state)) => {
                tracing::info!(
                    path = %self.path.display(),
                    count = state.snapshot.len(),
                    last_update = ?state.last_updated_at,
                    "Loaded price cache"
                );
                state
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No price cache on disk, starting empty");
                CacheState::empty()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to load price cache");
                CacheState::empty()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<CacheState>, CacheError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: CacheFileIn = serde_json::from_str(&contents)?;

        let mut quotes = QuoteBatch::new();
        for (symbol, stored) in file.prices {
            let Some(asset) = Asset::from_symbol(&symbol) else {
                tracing::debug!(symbol = %symbol, "Skipping unknown asset in price cache");
                continue;
            };
            if let Some(quote) = Quote::new(stored.price, stored.change_24h, stored.source) {
                quotes.insert(asset, quote);
            }
        }

        let last_updated_at = file.last_update.as_deref().and_then(parse_timestamp);
        let captured_at = last_updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(Some(CacheState {
            snapshot: PriceSnapshot::new(quotes, captured_at),
            last_updated_at,
        }))
    }

    /// Persists the state, replacing the previous file atomically
    ///
    /// The document is written to a sibling temp file, synced, then renamed
    /// over the cache file, so a crash never leaves a truncated cache behind.
    pub async fn save(&self, state: &CacheState) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let document = CacheFileOut {
            prices: state
                .snapshot
                .iter()
                .map(|(asset, quote)| (asset.symbol(), quote))
                .collect(),
            last_update: state.last_updated_at.map(|t| t.to_rfc3339()),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            count = state.snapshot.len(),
            "Saved price cache"
        );
        Ok(())
    }
}

impl Default for PriceCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// Parses an RFC 3339 timestamp, or a naive ISO-8601 one taken as local time
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuoteSource;
    use tempfile::TempDir;

    fn sample_state() -> CacheState {
        let mut quotes = QuoteBatch::new();
        quotes.insert(
            Asset::BTC,
            Quote::new(65432.1, 3.2, QuoteSource::Primary).unwrap(),
        );
        quotes.insert(
            Asset::DOGE,
            Quote::new(0.0000123, -4.5, QuoteSource::Primary).unwrap(),
        );

        let mut state = CacheState::empty();
        // Whole seconds survive the RFC 3339 round trip exactly
        let now = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        state.replace(quotes, now);
        state
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = PriceCacheStore::new(dir.path().join("data"));

        let state = store.load().await;
        assert_eq!(state, CacheState::empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = PriceCacheStore::new(dir.path().join("data"));
        let state = sample_state();

        store.save(&state).await.unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());

        // A fresh store stands in for a process restart
        let reloaded = PriceCacheStore::new(dir.path().join("data")).load().await;
        assert_eq!(reloaded, state);
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = PriceCacheStore::new(dir.path());
        store.save(&sample_state()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["prices"]["BTC"]["price"], 65432.1);
        assert_eq!(json["prices"]["BTC"]["change_24h"], 3.2);
        assert_eq!(json["prices"]["BTC"]["source"], "CoinGecko");
        assert!(json["last_update"].is_string());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = PriceCacheStore::new(dir.path());
        std::fs::write(store.path(), r#"{"prices": {"BTC": {"price": 1"#).unwrap();

        assert_eq!(store.load().await, CacheState::empty());
    }

    #[tokio::test]
    async fn test_skips_unknown_and_invalid_entries() {
        let dir = TempDir::new().unwrap();
        let store = PriceCacheStore::new(dir.path());
        std::fs::write(
            store.path(),
            r#"{
                "prices": {
                    "BTC": {"price": 50000.0, "change_24h": 1.0, "source": "Binance"},
                    "PEPE": {"price": 0.1, "change_24h": 0.0, "source": "CoinGecko"},
                    "ETH": {"price": -5.0, "change_24h": 0.0, "source": "CoinGecko"}
                },
                "last_update": "2024-05-01T10:30:00.123456"
            }"#,
        )
        .unwrap();

        let state = store.load().await;
        assert_eq!(state.snapshot.len(), 1);
        assert_eq!(
            state.snapshot.get(Asset::BTC).unwrap().source,
            QuoteSource::Secondary
        );
        assert!(state.last_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = PriceCacheStore::new(blocker.join("data"));
        assert!(store.save(&sample_state()).await.is_err());
    }

    #[test]
    fn test_is_valid() {
        let state = sample_state();
        let updated = state.last_updated_at.unwrap();
        let ttl = Duration::from_secs(60);

        assert!(is_valid(&state, updated + chrono::Duration::seconds(59), ttl));
        assert!(!is_valid(&state, updated + chrono::Duration::seconds(61), ttl));
        assert!(!is_valid(&CacheState::empty(), updated, ttl));
    }
}
