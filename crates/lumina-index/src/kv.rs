//! Key-value store contract
//!
//! Durable side index for metadata records and inverted search indexes.
//! Values are opaque strings (serialized JSON at the call sites). The
//! in-memory implementation backs tests and local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::IndexResult;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> IndexResult<Option<String>>;

    /// Store a value, optionally expiring after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> IndexResult<()>;

    /// Remove a key. Absent keys are not an error.
    async fn delete(&self, key: &str) -> IndexResult<()>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>>;
}

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }
}

/// In-memory [`KvStore`] implementation with lazy TTL expiry.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, KvEntry>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, expired ones included; used by tests.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> IndexResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => Ok(None),
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> IndexResult<()> {
        let entry = KvEntry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> IndexResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let kv = MemoryKvStore::new();
        kv.put("k", "v".to_string(), None).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
        // Deleting again is fine.
        kv.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let kv = MemoryKvStore::new();
        kv.put("k", "v".to_string(), Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(kv.list("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let kv = MemoryKvStore::new();
        for key in ["tag:sunset", "tag:city", "user:alice"] {
            kv.put(key, "[]".to_string(), None).await.unwrap();
        }
        let keys = kv.list("tag:").await.unwrap();
        assert_eq!(keys, vec!["tag:city".to_string(), "tag:sunset".to_string()]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let kv = MemoryKvStore::new();
        kv.put("k", "old".to_string(), None).await.unwrap();
        kv.put("k", "new".to_string(), None).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
