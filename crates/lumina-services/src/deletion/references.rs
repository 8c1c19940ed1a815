//! Referencing-entity lookups
//!
//! Posts and draft posts reference assets without owning them. The deletion
//! engine consults this contract to warn about live references and to null
//! them out before an asset disappears.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use lumina_core::AppError;

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Ids of published posts referencing the asset.
    async fn posts_referencing(&self, asset_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Ids of draft posts referencing the asset.
    async fn drafts_referencing(&self, asset_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Null out every reference to the asset; returns how many were cleared.
    async fn clear_references(&self, asset_id: Uuid) -> Result<usize, AppError>;
}

#[derive(Debug, Clone, Default)]
struct References {
    posts: Vec<Uuid>,
    drafts: Vec<Uuid>,
}

/// In-memory [`ReferenceStore`] for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryReferenceStore {
    entries: Arc<RwLock<HashMap<Uuid, References>>>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_post_reference(&self, asset_id: Uuid, post_id: Uuid) {
        self.entries
            .write()
            .await
            .entry(asset_id)
            .or_default()
            .posts
            .push(post_id);
    }

    pub async fn add_draft_reference(&self, asset_id: Uuid, draft_id: Uuid) {
        self.entries
            .write()
            .await
            .entry(asset_id)
            .or_default()
            .drafts
            .push(draft_id);
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn posts_referencing(&self, asset_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&asset_id)
            .map(|r| r.posts.clone())
            .unwrap_or_default())
    }

    async fn drafts_referencing(&self, asset_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&asset_id)
            .map(|r| r.drafts.clone())
            .unwrap_or_default())
    }

    async fn clear_references(&self, asset_id: Uuid) -> Result<usize, AppError> {
        match self.entries.write().await.remove(&asset_id) {
            Some(refs) => Ok(refs.posts.len() + refs.drafts.len()),
            None => Ok(0),
        }
    }
}
