//! Canonical metadata store
//!
//! Writes are validated before any side effect, then dual-persisted: the
//! durable key-value side index is the source of truth, and the record is
//! mirrored into custom headers on the backing storage object when that
//! object already exists. The cache is strictly advisory: a failed cache
//! write is logged and never blocks the durable writes.
//!
//! Reads are cache-aside: cache, then side index, then (last resort) the
//! object-storage headers; the first hit is re-cached before returning.
//!
//! `update` is read-modify-write against the full record. Concurrent updates
//! to the same asset are last-write-wins; the underlying stores expose no
//! transactions and the race window is accepted.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use lumina_cache::{Cache, CacheExt};
use lumina_core::models::{MediaAsset, MediaAssetUpdate, TransformationRecord};
use lumina_storage::{keys::IMAGE_KEY_PREFIX, ObjectStorage, StorageError};

use crate::keys;
use crate::kv::KvStore;
use crate::search::SearchIndex;
use crate::{IndexError, IndexResult};

/// Object header carrying the asset id, used to locate a record when the
/// side index has lost it.
pub const ASSET_ID_HEADER: &str = "x-lumina-asset-id";
/// Object header carrying the owner id.
pub const OWNER_ID_HEADER: &str = "x-lumina-owner-id";
/// Object header holding the full serialized record.
pub const METADATA_HEADER: &str = "x-lumina-metadata";

#[derive(Clone)]
pub struct MetadataStore {
    kv: Arc<dyn KvStore>,
    storage: Arc<dyn ObjectStorage>,
    cache: Arc<dyn Cache>,
    index: Arc<SearchIndex>,
    cache_ttl_secs: u64,
}

impl MetadataStore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        storage: Arc<dyn ObjectStorage>,
        cache: Arc<dyn Cache>,
        index: Arc<SearchIndex>,
        cache_ttl_secs: u64,
    ) -> Self {
        MetadataStore {
            kv,
            storage,
            cache,
            index,
            cache_ttl_secs,
        }
    }

    /// Persist a full record. Validation failures reject the write before
    /// any side effect; on success the search index is brought in line with
    /// the record's current tags and owner.
    #[tracing::instrument(skip(self, asset), fields(asset_id = %asset.id))]
    pub async fn store(&self, asset: &MediaAsset) -> IndexResult<()> {
        asset
            .validate()
            .map_err(|e| IndexError::Validation(e.to_string()))?;

        // Previous tags must leave the inverted indexes before the new ones
        // are added, otherwise renamed tags leave stale entries behind.
        let previous = self.load_from_kv(asset.id).await?;

        let serialized = serde_json::to_string(asset)?;
        self.kv
            .put(&keys::metadata_key(asset.id), serialized, None)
            .await?;

        self.write_object_headers(asset).await;
        self.cache_record(asset).await;

        if let Some(previous) = previous {
            self.index.remove_asset(&previous).await?;
        }
        if asset.deleted {
            self.index.remove_asset(asset).await?;
        } else {
            self.index.index_asset(asset).await?;
        }

        tracing::info!(asset_id = %asset.id, storage_key = %asset.storage_key, "Stored metadata record");
        Ok(())
    }

    /// Cache-aside read: cache, side index, object headers.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id))]
    pub async fn get(&self, asset_id: Uuid) -> IndexResult<Option<MediaAsset>> {
        let cache_key = keys::metadata_key(asset_id);
        match self.cache.get_typed::<MediaAsset>(&cache_key).await {
            Ok(Some(asset)) => return Ok(Some(asset)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Cache read failed, falling through"),
        }

        if let Some(asset) = self.load_from_kv(asset_id).await? {
            self.cache_record(&asset).await;
            return Ok(Some(asset));
        }

        if let Some(asset) = self.recover_from_headers(asset_id).await {
            // Repair the side index so the next read skips the scan.
            if let Err(e) = self
                .kv
                .put(
                    &keys::metadata_key(asset_id),
                    serde_json::to_string(&asset)?,
                    None,
                )
                .await
            {
                tracing::warn!(error = %e, asset_id = %asset_id, "Failed to repair side index");
            }
            self.cache_record(&asset).await;
            return Ok(Some(asset));
        }

        Ok(None)
    }

    /// Read-modify-write partial update; refreshes `updated_at`.
    #[tracing::instrument(skip(self, update), fields(asset_id = %asset_id))]
    pub async fn update(
        &self,
        asset_id: Uuid,
        update: &MediaAssetUpdate,
    ) -> IndexResult<MediaAsset> {
        let mut asset = self
            .get(asset_id)
            .await?
            .ok_or_else(|| IndexError::NotFound(format!("Asset not found: {}", asset_id)))?;
        asset.apply_update(update);
        self.store(&asset).await?;
        Ok(asset)
    }

    /// Append one entry to the asset's transformation audit trail and
    /// persist the record. The trail is append-only; entries already on the
    /// record are carried through untouched.
    #[tracing::instrument(skip(self, record), fields(asset_id = %asset_id, kind = ?record.kind))]
    pub async fn record_transformation(
        &self,
        asset_id: Uuid,
        record: TransformationRecord,
    ) -> IndexResult<MediaAsset> {
        let mut asset = self
            .get(asset_id)
            .await?
            .ok_or_else(|| IndexError::NotFound(format!("Asset not found: {}", asset_id)))?;
        asset.append_transformation(record);
        self.store(&asset).await?;
        Ok(asset)
    }

    /// Remove the side-index entry, the cache entry, and the search-index
    /// entries. The object-storage header copy is discarded implicitly once
    /// the backing object itself is deleted.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id))]
    pub async fn delete(&self, asset_id: Uuid) -> IndexResult<()> {
        let asset = self
            .load_from_kv(asset_id)
            .await?
            .ok_or_else(|| IndexError::NotFound(format!("Asset not found: {}", asset_id)))?;

        self.kv.delete(&keys::metadata_key(asset_id)).await?;
        if let Err(e) = self.cache.delete(&keys::metadata_key(asset_id)).await {
            tracing::warn!(error = %e, asset_id = %asset_id, "Failed to drop cache entry");
        }
        self.index.remove_asset(&asset).await?;

        tracing::info!(asset_id = %asset_id, "Deleted metadata record");
        Ok(())
    }

    async fn load_from_kv(&self, asset_id: Uuid) -> IndexResult<Option<MediaAsset>> {
        match self.kv.get(&keys::metadata_key(asset_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Mirror the record into custom headers on the backing object, when it
    /// exists. Best-effort: a missing object or a header-write failure is
    /// logged, never surfaced.
    async fn write_object_headers(&self, asset: &MediaAsset) {
        let info = match self.storage.head(&asset.storage_key).await {
            Ok(info) => info,
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(
                    storage_key = %asset.storage_key,
                    "Object not uploaded yet, skipping header mirror"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, storage_key = %asset.storage_key, "Failed to head object");
                return;
            }
        };

        let mut headers: BTreeMap<String, String> = info.headers;
        headers.insert(ASSET_ID_HEADER.to_string(), asset.id.to_string());
        headers.insert(OWNER_ID_HEADER.to_string(), asset.owner_id.to_string());
        match serde_json::to_string(asset) {
            Ok(serialized) => {
                headers.insert(METADATA_HEADER.to_string(), serialized);
            }
            Err(e) => {
                tracing::warn!(error = %e, asset_id = %asset.id, "Failed to serialize header mirror");
                return;
            }
        }

        if let Err(e) = self.storage.set_headers(&asset.storage_key, &headers).await {
            tracing::warn!(error = %e, storage_key = %asset.storage_key, "Failed to mirror metadata headers");
        }
    }

    async fn cache_record(&self, asset: &MediaAsset) {
        let key = keys::metadata_key(asset.id);
        if let Err(e) = self.cache.set_typed(&key, asset, self.cache_ttl_secs).await {
            tracing::warn!(error = %e, asset_id = %asset.id, "Advisory cache write failed");
        }
    }

    /// Last-resort recovery: scan the image prefix for an object whose
    /// headers carry the requested asset id. Linear in bucket size, only
    /// reached when both cache and side index have lost the record.
    async fn recover_from_headers(&self, asset_id: Uuid) -> Option<MediaAsset> {
        let keys = match self.storage.list(IMAGE_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Header recovery scan failed to list objects");
                return None;
            }
        };
        let wanted = asset_id.to_string();

        for key in keys {
            let info = match self.storage.head(&key).await {
                Ok(info) => info,
                Err(_) => continue,
            };
            if info.headers.get(ASSET_ID_HEADER) != Some(&wanted) {
                continue;
            }
            match info
                .headers
                .get(METADATA_HEADER)
                .map(|raw| serde_json::from_str::<MediaAsset>(raw))
            {
                Some(Ok(asset)) => {
                    tracing::warn!(
                        asset_id = %asset_id,
                        storage_key = %key,
                        "Recovered metadata record from object headers"
                    );
                    return Some(asset);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, storage_key = %key, "Corrupt metadata header");
                }
                None => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use bytes::Bytes;
    use chrono::Utc;
    use lumina_cache::MemoryCache;
    use lumina_core::models::{TransformationKind, Visibility};
    use lumina_storage::MemoryObjectStorage;

    struct Fixture {
        kv: Arc<MemoryKvStore>,
        storage: Arc<MemoryObjectStorage>,
        cache: Arc<MemoryCache>,
        index: Arc<SearchIndex>,
        store: MetadataStore,
    }

    fn fixture() -> Fixture {
        let kv = Arc::new(MemoryKvStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        let cache = Arc::new(MemoryCache::new(64));
        let index = Arc::new(SearchIndex::new(kv.clone(), 100));
        let store = MetadataStore::new(
            kv.clone(),
            storage.clone(),
            cache.clone(),
            index.clone(),
            300,
        );
        Fixture {
            kv,
            storage,
            cache,
            index,
            store,
        }
    }

    fn sample_asset() -> MediaAsset {
        let now = Utc::now();
        let owner_id = Uuid::new_v4();
        MediaAsset {
            id: Uuid::new_v4(),
            owner_id,
            file_name: "sunset.jpg".to_string(),
            storage_key: format!("images/{}_sunset.jpg", owner_id),
            mime_type: "image/jpeg".to_string(),
            format: "jpeg".to_string(),
            width: 1920,
            height: 1080,
            size_bytes: 240_000,
            visibility: Visibility::Public,
            tags: ["nature", "sunset"].iter().map(|s| s.to_string()).collect(),
            category: Some("landscape".to_string()),
            deleted: false,
            variants: Vec::new(),
            transformations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ====== STORE ======

    #[tokio::test]
    async fn test_store_then_get_roundtrip() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        let loaded = f.store.get(asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, asset.id);
        assert_eq!(loaded.tags, asset.tags);
    }

    #[tokio::test]
    async fn test_invalid_record_rejected_before_side_effects() {
        let f = fixture();
        let mut asset = sample_asset();
        asset.width = 0;

        let result = f.store.store(&asset).await;
        assert!(matches!(result, Err(IndexError::Validation(_))));
        assert_eq!(f.kv.len().await, 0);
        assert!(f.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_indexes_tags_and_owner() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        let by_tag = f
            .index
            .search_by_tags(&["nature".to_string()], None)
            .await
            .unwrap();
        assert_eq!(by_tag, vec![asset.id]);
        let by_owner = f
            .index
            .search_by_tags(&["nature".to_string()], Some(asset.owner_id))
            .await
            .unwrap();
        assert_eq!(by_owner, vec![asset.id]);
    }

    #[tokio::test]
    async fn test_store_mirrors_headers_when_object_exists() {
        let f = fixture();
        let asset = sample_asset();
        f.storage
            .put(&asset.storage_key, Bytes::from_static(b"img"), &BTreeMap::new())
            .await
            .unwrap();

        f.store.store(&asset).await.unwrap();

        let info = f.storage.head(&asset.storage_key).await.unwrap();
        assert_eq!(
            info.headers.get(ASSET_ID_HEADER),
            Some(&asset.id.to_string())
        );
        assert!(info.headers.contains_key(METADATA_HEADER));
    }

    #[tokio::test]
    async fn test_store_without_object_still_succeeds() {
        let f = fixture();
        let asset = sample_asset();
        // No object uploaded: the header mirror is skipped, not an error.
        f.store.store(&asset).await.unwrap();
        assert!(f.store.get(asset.id).await.unwrap().is_some());
    }

    // ====== GET ======

    #[tokio::test]
    async fn test_get_falls_back_to_kv_and_recaches() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        // Drop the cache entry; the side index must serve and re-cache.
        f.cache.delete(&keys::metadata_key(asset.id)).await.unwrap();
        let loaded = f.store.get(asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, asset.id);
        assert!(!f.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_recovers_from_object_headers() {
        let f = fixture();
        let asset = sample_asset();
        f.storage
            .put(&asset.storage_key, Bytes::from_static(b"img"), &BTreeMap::new())
            .await
            .unwrap();
        f.store.store(&asset).await.unwrap();

        // Simulate total side-index and cache loss.
        f.kv.delete(&keys::metadata_key(asset.id)).await.unwrap();
        f.cache.delete(&keys::metadata_key(asset.id)).await.unwrap();

        let recovered = f.store.get(asset.id).await.unwrap().unwrap();
        assert_eq!(recovered.id, asset.id);
        // The side index was repaired.
        assert!(f
            .kv
            .get(&keys::metadata_key(asset.id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let f = fixture();
        assert!(f.store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    // ====== UPDATE ======

    #[tokio::test]
    async fn test_update_refreshes_updated_at_and_reindexes_tags() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        let update = MediaAssetUpdate {
            tags: Some(["city"].iter().map(|s| s.to_string()).collect()),
            ..MediaAssetUpdate::default()
        };
        let updated = f.store.update(asset.id, &update).await.unwrap();
        assert!(updated.updated_at >= asset.updated_at);

        // Old tag entries are gone, new ones present.
        let old = f
            .index
            .search_by_tags(&["nature".to_string()], None)
            .await
            .unwrap();
        assert!(old.is_empty());
        let new = f
            .index
            .search_by_tags(&["city".to_string()], None)
            .await
            .unwrap();
        assert_eq!(new, vec![asset.id]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let f = fixture();
        let result = f
            .store
            .update(Uuid::new_v4(), &MediaAssetUpdate::default())
            .await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_last_write_wins() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        // Two read-modify-write updates from the same snapshot: the second
        // write overwrites the first. Documented, accepted race.
        let first = MediaAssetUpdate {
            category: Some("city".to_string()),
            ..MediaAssetUpdate::default()
        };
        let second = MediaAssetUpdate {
            file_name: Some("renamed.jpg".to_string()),
            ..MediaAssetUpdate::default()
        };
        f.store.update(asset.id, &first).await.unwrap();
        f.store.update(asset.id, &second).await.unwrap();

        let loaded = f.store.get(asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.file_name, "renamed.jpg");
        // Sequential here, so both landed; a true interleaving would lose
        // the first write.
        assert_eq!(loaded.category.as_deref(), Some("city"));
    }

    // ====== TRANSFORMATION TRAIL ======

    #[tokio::test]
    async fn test_record_transformation_appends_and_survives_reload() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();
        let editor = Uuid::new_v4();

        let resize = TransformationRecord::new(
            TransformationKind::Resize,
            [("w".to_string(), "800".to_string())].into_iter().collect(),
            editor,
        );
        let first_id = resize.id;
        f.store.record_transformation(asset.id, resize).await.unwrap();
        f.store
            .record_transformation(
                asset.id,
                TransformationRecord::new(TransformationKind::Rotate, BTreeMap::new(), editor),
            )
            .await
            .unwrap();

        // Drop the cache entry so the reload comes from the durable store.
        f.cache.delete(&keys::metadata_key(asset.id)).await.unwrap();
        let loaded = f.store.get(asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.transformations.len(), 2);
        assert_eq!(loaded.transformations[0].id, first_id);
        assert_eq!(loaded.transformations[0].kind, TransformationKind::Resize);
        assert_eq!(loaded.transformations[1].kind, TransformationKind::Rotate);
    }

    #[tokio::test]
    async fn test_record_transformation_missing_is_not_found() {
        let f = fixture();
        let record =
            TransformationRecord::new(TransformationKind::Filter, BTreeMap::new(), Uuid::new_v4());
        let result = f.store.record_transformation(Uuid::new_v4(), record).await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    // ====== DELETE ======

    #[tokio::test]
    async fn test_delete_removes_record_cache_and_index() {
        let f = fixture();
        let asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        f.store.delete(asset.id).await.unwrap();

        assert!(f.store.get(asset.id).await.unwrap().is_none());
        let hits = f
            .index
            .search_by_tags(&["nature".to_string()], None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let f = fixture();
        let result = f.store.delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_soft_deleted_record_leaves_search_index() {
        let f = fixture();
        let mut asset = sample_asset();
        f.store.store(&asset).await.unwrap();

        asset.deleted = true;
        f.store.store(&asset).await.unwrap();

        let hits = f
            .index
            .search_by_tags(&["nature".to_string()], None)
            .await
            .unwrap();
        assert!(hits.is_empty());
        // The record itself is retained.
        assert!(f.store.get(asset.id).await.unwrap().unwrap().deleted);
    }
}
