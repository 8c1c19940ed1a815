//! In-memory storage backend
//!
//! Backs tests and local development. Objects live in a `HashMap` behind a
//! `tokio::sync::RwLock`; presigned URLs are synthesized with a SHA-256
//! token so callers can exercise the presign flow without real credentials.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::traits::{ObjectInfo, ObjectStorage, PresignMethod, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    headers: BTreeMap<String, String>,
}

/// In-memory [`ObjectStorage`] implementation.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    base_url: String,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        MemoryObjectStorage {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: "https://storage.test".to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        MemoryObjectStorage {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into(),
        }
    }

    /// Number of stored objects; used by tests.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        headers: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        Self::validate_key(key)?;
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                headers: headers.clone(),
            },
        );
        tracing::debug!(storage_key = %key, "Stored object in memory backend");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectInfo> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| ObjectInfo {
                key: key.to_string(),
                size_bytes: o.data.len() as u64,
                headers: o.headers.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn set_headers(
        &self,
        key: &str,
        headers: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        match objects.get_mut(key) {
            Some(object) => {
                object.headers = headers.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        // Idempotent: absent keys are not an error.
        objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let objects = self.objects.read().await;
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn create_presigned_url(
        &self,
        key: &str,
        method: PresignMethod,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Self::validate_key(key)?;
        let expires_at = chrono::Utc::now().timestamp() + expires_in.as_secs() as i64;
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(method.as_str().as_bytes());
        hasher.update(expires_at.to_be_bytes());
        let token = hex::encode(&hasher.finalize()[..16]);
        Ok(format!(
            "{}/{}?method={}&expires={}&token={}",
            self.base_url,
            urlencoding::encode(key),
            method.as_str(),
            expires_at,
            token
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_put_get_head() {
        let storage = MemoryObjectStorage::new();
        let meta = headers(&[("x-owner", "alice")]);
        storage
            .put("images/a_pic.jpg", Bytes::from_static(b"bytes"), &meta)
            .await
            .unwrap();

        let data = storage.get("images/a_pic.jpg").await.unwrap();
        assert_eq!(&data[..], b"bytes");

        let info = storage.head("images/a_pic.jpg").await.unwrap();
        assert_eq!(info.size_bytes, 5);
        assert_eq!(info.headers.get("x-owner").map(String::as_str), Some("alice"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = MemoryObjectStorage::new();
        match storage.get("nope").await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = MemoryObjectStorage::new();
        storage
            .put("k", Bytes::from_static(b"x"), &BTreeMap::new())
            .await
            .unwrap();
        storage.delete("k").await.unwrap();
        // Second delete of the same key is still Ok.
        storage.delete("k").await.unwrap();
        assert!(!storage.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_headers_requires_object() {
        let storage = MemoryObjectStorage::new();
        let result = storage.set_headers("missing", &headers(&[("a", "b")])).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        storage
            .put("present", Bytes::from_static(b"x"), &BTreeMap::new())
            .await
            .unwrap();
        storage
            .set_headers("present", &headers(&[("a", "b")]))
            .await
            .unwrap();
        let info = storage.head("present").await.unwrap();
        assert_eq!(info.headers.get("a").map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let storage = MemoryObjectStorage::new();
        for key in ["images/a/variants/1w.webp", "images/a/variants/2w.webp", "images/b"] {
            storage
                .put(key, Bytes::from_static(b"x"), &BTreeMap::new())
                .await
                .unwrap();
        }
        let keys = storage.list("images/a/variants/").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_presigned_url_shape() {
        let storage = MemoryObjectStorage::new();
        let url = storage
            .create_presigned_url("images/a_pic.jpg", PresignMethod::Put, Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("https://storage.test/"));
        assert!(url.contains("method=PUT"));
        assert!(url.contains("token="));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let storage = MemoryObjectStorage::new();
        let result = storage
            .put("../escape", Bytes::from_static(b"x"), &BTreeMap::new())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
