use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::series::PriceSeries;
use crate::types::BarInterval;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Composite key that identifies a unique price series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: BarInterval,
}

impl SeriesKey {
    pub fn new(symbol: &str, interval: BarInterval) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            interval,
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

// ---------------------------------------------------------------------------
// SeriesCache -- thread-safe TTL map per (symbol, interval)
// ---------------------------------------------------------------------------

struct CachedSeries {
    series: Arc<PriceSeries>,
    fetched_at: Instant,
}

/// Thread-safe cache of fetched series.  Entries older than `ttl` are treated
/// as missing and replaced on the next insert; a zero TTL disables caching.
pub struct SeriesCache {
    entries: RwLock<HashMap<SeriesKey, CachedSeries>>,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached series for `key` if it is still fresh.
    pub fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        let map = self.entries.read();
        let entry = map.get(key)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.series.clone())
        } else {
            debug!(key = %key, "cached series expired");
            None
        }
    }

    /// Store a freshly fetched series. Empty series are not cached so that a
    /// transient "no data" answer does not stick.
    pub fn insert(&self, key: SeriesKey, series: Arc<PriceSeries>) {
        if series.is_empty() || self.ttl.is_zero() {
            return;
        }
        self.entries.write().insert(
            key,
            CachedSeries {
                series,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) -> usize {
        let mut map = self.entries.write();
        let before = map.len();
        map.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::series::PriceBar;
    use chrono::{TimeZone, Utc};

    fn one_bar_series(symbol: &str) -> Arc<PriceSeries> {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Arc::new(
            PriceSeries::new(
                symbol,
                BarInterval::Weekly,
                vec![PriceBar::new(ts, 10.0, 11.0, 9.0, 10.5)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn key_normalises_symbol() {
        let key = SeriesKey::new(" aapl ", BarInterval::Weekly);
        assert_eq!(key.symbol, "AAPL");
        assert_eq!(key.to_string(), "AAPL@1wk");
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        let key = SeriesKey::new("AAPL", BarInterval::Weekly);
        cache.insert(key.clone(), one_bar_series("AAPL"));
        assert_eq!(cache.get(&key).map(|s| s.len()), Some(1));
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = SeriesCache::new(Duration::ZERO);
        let key = SeriesKey::new("AAPL", BarInterval::Weekly);
        cache.insert(key.clone(), one_bar_series("AAPL"));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn empty_series_not_cached() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        let key = SeriesKey::new("NOPE", BarInterval::Weekly);
        cache.insert(key.clone(), Arc::new(PriceSeries::empty("NOPE", BarInterval::Weekly)));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn expired_entries_are_purged() {
        let cache = SeriesCache::new(Duration::from_millis(1));
        let key = SeriesKey::new("AAPL", BarInterval::Weekly);
        cache.insert(key.clone(), one_bar_series("AAPL"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 0);
    }
}
