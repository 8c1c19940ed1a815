//! Canonical metadata and search indexes
//!
//! `MetadataStore` owns the asset record lifecycle (dual persistence to a
//! key-value side index and object-storage headers, cache-aside reads);
//! `SearchIndex` maintains the inverted tag/owner indexes derived from every
//! metadata write and answers filtered search and facet queries.

pub mod keys;
pub mod kv;
pub mod metadata;
pub mod search;

use thiserror::Error;

pub use kv::{KvStore, MemoryKvStore};
pub use metadata::MetadataStore;
pub use search::SearchIndex;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Key-value store error: {0}")]
    Kv(String),

    #[error("Index serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl From<IndexError> for lumina_core::AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Validation(msg) => lumina_core::AppError::Validation(msg),
            IndexError::NotFound(msg) => lumina_core::AppError::NotFound(msg),
            other => lumina_core::AppError::Index(other.to_string()),
        }
    }
}
