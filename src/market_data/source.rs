// =============================================================================
// Series Source — the seam between indicator computation and data retrieval
// =============================================================================
//
// Anything that can produce a `PriceSeries` for a symbol implements
// `SeriesSource`.  The HTTP client is one implementation; `CachedSource`
// decorates any other source with a TTL cache; tests plug in an in-memory
// source.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::series::PriceSeries;
use super::series_cache::{SeriesCache, SeriesKey};
use crate::types::BarInterval;

/// Producer of historical price series and symbol suggestions.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch the full available history for `symbol` at `interval`.
    ///
    /// An unknown symbol may either fail or return an empty series; callers
    /// treat both as "nothing to compute".
    async fn fetch_series(&self, symbol: &str, interval: BarInterval) -> Result<PriceSeries>;

    /// Symbols matching a free-text query, best match first.
    async fn search_symbols(&self, query: &str) -> Result<Vec<String>>;
}

/// Wraps a source with a [`SeriesCache`].
pub struct CachedSource<S> {
    inner: S,
    cache: SeriesCache,
}

impl<S: SeriesSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: SeriesCache::new(ttl),
        }
    }

    /// Fetch through the cache, returning a shared snapshot.
    pub async fn fetch_shared(&self, symbol: &str, interval: BarInterval) -> Result<Arc<PriceSeries>> {
        let key = SeriesKey::new(symbol, interval);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "series cache hit");
            return Ok(hit);
        }
        let series = Arc::new(self.inner.fetch_series(&key.symbol, interval).await?);
        self.cache.insert(key, series.clone());
        Ok(series)
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }
}

#[async_trait]
impl<S: SeriesSource> SeriesSource for CachedSource<S> {
    async fn fetch_series(&self, symbol: &str, interval: BarInterval) -> Result<PriceSeries> {
        Ok(self.fetch_shared(symbol, interval).await?.as_ref().clone())
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<String>> {
        self.inner.search_symbols(query).await
    }
}

// =============================================================================
// In-memory source (tests)
// =============================================================================
