//! Time-expiring cache of aggregate responses.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::CacheConfig;
use crate::observability::metrics;

/// A stored value and the time it was written.
#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

/// A thread-safe TTL cache with oldest-first eviction.
///
/// Values are handed out as shared `Arc`s and are never mutated in place;
/// a write replaces the whole entry.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    max_items: usize,
}

impl<V> TtlCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_params(config.ttl(), config.max_items)
    }

    pub fn with_params(ttl: Duration, max_items: usize) -> Self {
        Self {
            inner: DashMap::new(),
            ttl,
            max_items,
        }
    }

    /// Get the value for `key` if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let hit = self
            .inner
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone());
        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.inner.insert(
            key.into(),
            CacheEntry {
                value: value.clone(),
                stored_at: Instant::now(),
            },
        );
        if self.inner.len() > self.max_items {
            self.evict_oldest();
        }
        metrics::record_cache_size(self.inner.len());
        value
    }

    /// Evict oldest-by-timestamp entries until the cache is within its cap.
    fn evict_oldest(&self) {
        let mut by_age: Vec<(Instant, String)> = self
            .inner
            .iter()
            .map(|r| (r.value().stored_at, r.key().clone()))
            .collect();
        by_age.sort();

        let excess = by_age.len().saturating_sub(self.max_items);
        for (_, key) in by_age.into_iter().take(excess) {
            self.inner.remove(&key);
        }
        tracing::debug!(evicted = excess, "Cache over capacity, evicted oldest entries");
    }

    /// Remove every expired entry.
    pub fn purge_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        metrics::record_cache_size(self.inner.len());
        before.saturating_sub(self.inner.len())
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V: Send + Sync + 'static> TtlCache<V> {
    /// Run the periodic purge until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = time::interval(every);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = self.purge_expired();
                    tracing::debug!(purged, remaining = self.len(), "Cache sweep");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
