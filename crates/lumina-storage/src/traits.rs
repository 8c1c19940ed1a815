//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must
//! implement. The media services work against this trait and never couple to
//! a concrete backend.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object metadata returned by `head`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: u64,
    /// Custom headers/attributes stored alongside the object.
    pub headers: BTreeMap<String, String>,
}

/// HTTP method a presigned URL grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Get,
    Put,
}

impl PresignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresignMethod::Get => "GET",
            PresignMethod::Put => "PUT",
        }
    }
}

/// Object storage abstraction
///
/// Keys follow the conventions in [`crate::keys`]; backends store custom
/// headers with the object and return them from `head`. `delete` is
/// idempotent: deleting an absent key succeeds, matching S3-style semantics.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object with custom headers, replacing any existing object.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        headers: &BTreeMap<String, String>,
    ) -> StorageResult<()>;

    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Fetch an object's size and custom headers without its bytes.
    async fn head(&self, key: &str) -> StorageResult<ObjectInfo>;

    /// Replace the custom headers on an existing object without rewriting
    /// its bytes. Fails with `NotFound` when the object is absent.
    async fn set_headers(
        &self,
        key: &str,
        headers: &BTreeMap<String, String>,
    ) -> StorageResult<()>;

    /// Delete an object. Absent keys are not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Generate a time-limited, credential-free URL granting direct access
    /// to one object for the given method.
    async fn create_presigned_url(
        &self,
        key: &str,
        method: PresignMethod,
        expires_in: Duration,
    ) -> StorageResult<String>;
}
