//! Advisory edge-result cache
//!
//! The cache is strictly advisory: a miss or a failed cache write never
//! changes correctness, only latency. Services treat every error from this
//! contract as loggable and non-fatal. Values cross the trait boundary as
//! `serde_json::Value`; the [`CacheExt`] extension adds typed accessors on
//! top of the object-safe core.

pub mod memory;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Boxed loader future used by `get_or_set`.
pub type CacheLoader<'a> =
    Pin<Box<dyn Future<Output = CacheResult<serde_json::Value>> + Send + 'a>>;

/// Object-safe cache contract.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value, ttl_secs: u64) -> CacheResult<()>;

    /// Return the cached value, or run the loader and cache its result.
    async fn get_or_set(
        &self,
        key: &str,
        loader: CacheLoader<'_>,
        ttl_secs: u64,
    ) -> CacheResult<serde_json::Value>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Remove every key matching a trailing-wildcard glob (`asset:abc:*`).
    /// A pattern without `*` behaves like `delete`. Returns the number of
    /// invalidated entries.
    async fn invalidate_pattern(&self, pattern: &str) -> CacheResult<usize>;
}

/// Typed helpers over the JSON-valued core contract.
#[async_trait]
pub trait CacheExt: Cache {
    async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_typed<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> CacheResult<()> {
        self.set(key, serde_json::to_value(value)?, ttl_secs).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
