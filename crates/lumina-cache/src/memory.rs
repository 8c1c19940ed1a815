//! Bounded in-memory cache
//!
//! LRU-evicted map with per-entry TTL behind a `tokio::sync::Mutex`. Expired
//! entries are dropped lazily on read and during pattern invalidation.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::{Cache, CacheLoader, CacheResult};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory [`Cache`] implementation bounded by an LRU capacity.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        MemoryCache {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Number of live (possibly expired) entries; used by tests.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn matches(pattern: &str, key: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            key.starts_with(prefix)
        } else {
            key == pattern
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> CacheResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.lock().await.put(key.to_string(), entry);
        Ok(())
    }

    async fn get_or_set(
        &self,
        key: &str,
        loader: CacheLoader<'_>,
        ttl_secs: u64,
    ) -> CacheResult<serde_json::Value> {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = loader.await?;
        self.set(key, value.clone(), ttl_secs).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().await.pop(key);
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let mut entries = self.entries.lock().await;
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| Self::matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        let count = doomed.len();
        for key in doomed {
            entries.pop(&key);
        }
        if count > 0 {
            tracing::debug!(pattern = %pattern, invalidated = count, "Invalidated cache entries");
        }
        Ok(count)
    }
}
