//! Inverted search and facet index
//!
//! Two inverted maps are maintained on every metadata write: `tag:{value}` and
//! `user:{ownerId}`, each holding a serialized set of asset ids. Tag search
//! unions candidate sets across the requested tags, then intersects with the
//! owner set when an owner filter is present. Numeric/date/format/visibility
//! filters are applied as a final in-memory predicate pass over the candidate
//! records before pagination.
//!
//! A query with neither tag nor owner filter falls back to a full scan of the
//! metadata prefix, bounded by the configured max page size. That bound is the
//! documented scalability ceiling of this index.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use uuid::Uuid;

use lumina_core::models::{
    size_bucket_label, FacetCount, Facets, MediaAsset, SearchPage, SearchQuery, SortBy, SortOrder,
    SIZE_BUCKETS,
};

use crate::keys;
use crate::kv::KvStore;
use crate::IndexResult;

/// Page size applied when a query does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone)]
pub struct SearchIndex {
    kv: Arc<dyn KvStore>,
    max_page_size: usize,
}

impl SearchIndex {
    pub fn new(kv: Arc<dyn KvStore>, max_page_size: usize) -> Self {
        SearchIndex { kv, max_page_size }
    }

    /// Add an asset to the tag and owner inverted indexes.
    #[tracing::instrument(skip(self, asset), fields(asset_id = %asset.id))]
    pub async fn index_asset(&self, asset: &MediaAsset) -> IndexResult<()> {
        for tag in &asset.tags {
            self.add_to_set(&keys::tag_key(tag), asset.id).await?;
        }
        self.add_to_set(&keys::owner_key(asset.owner_id), asset.id)
            .await?;
        tracing::debug!(asset_id = %asset.id, tags = asset.tags.len(), "Indexed asset");
        Ok(())
    }

    /// Remove an asset from every index entry it appears in.
    #[tracing::instrument(skip(self, asset), fields(asset_id = %asset.id))]
    pub async fn remove_asset(&self, asset: &MediaAsset) -> IndexResult<()> {
        for tag in &asset.tags {
            self.remove_from_set(&keys::tag_key(tag), asset.id).await?;
        }
        self.remove_from_set(&keys::owner_key(asset.owner_id), asset.id)
            .await?;
        Ok(())
    }

    /// Union of the requested tags' candidate sets, intersected with the
    /// owner's set when an owner filter is present. Returned ids are sorted.
    pub async fn search_by_tags(
        &self,
        tags: &[String],
        owner_id: Option<Uuid>,
    ) -> IndexResult<Vec<Uuid>> {
        let mut candidates: BTreeSet<Uuid> = BTreeSet::new();
        for tag in tags {
            candidates.extend(self.read_id_set(&keys::tag_key(tag)).await?);
        }
        if let Some(owner_id) = owner_id {
            let owned = self.read_id_set(&keys::owner_key(owner_id)).await?;
            candidates.retain(|id| owned.contains(id));
        }
        Ok(candidates.into_iter().collect())
    }

    /// All of an owner's live assets, sorted and paginated per the query.
    pub async fn search_by_owner(
        &self,
        owner_id: Uuid,
        query: &SearchQuery,
    ) -> IndexResult<Vec<Uuid>> {
        let ids = self.read_id_set(&keys::owner_key(owner_id)).await?;
        let mut assets = self.load_assets(ids.iter().copied()).await?;
        sort_assets(&mut assets, query.sort_by, query.sort_order);
        let (limit, offset) = self.page_bounds(query);
        Ok(assets
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|a| a.id)
            .collect())
    }

    /// Facet counts over the full (unpaginated) candidate set of a query.
    pub async fn get_facets(&self, query: &SearchQuery) -> IndexResult<Facets> {
        let assets = self.filtered_candidates(query).await?;
        Ok(compute_facets(&assets))
    }

    /// Filtered, sorted, paginated results with facets over the whole
    /// candidate set.
    #[tracing::instrument(skip(self, query))]
    pub async fn search_images(&self, query: &SearchQuery) -> IndexResult<SearchPage> {
        let mut assets = self.filtered_candidates(query).await?;
        sort_assets(&mut assets, query.sort_by, query.sort_order);

        let facets = compute_facets(&assets);
        let total = assets.len();
        let (limit, offset) = self.page_bounds(query);
        let results: Vec<MediaAsset> = assets.into_iter().skip(offset).take(limit).collect();

        Ok(SearchPage {
            results,
            total,
            limit,
            offset,
            facets,
        })
    }

    /// Candidate records after index lookup (or bounded scan) and the
    /// in-memory predicate pass. Soft-deleted records never match.
    async fn filtered_candidates(&self, query: &SearchQuery) -> IndexResult<Vec<MediaAsset>> {
        let assets = if !query.tags.is_empty() {
            let ids = self.search_by_tags(&query.tags, query.owner_id).await?;
            self.load_assets(ids.into_iter()).await?
        } else if let Some(owner_id) = query.owner_id {
            let ids = self.read_id_set(&keys::owner_key(owner_id)).await?;
            self.load_assets(ids.into_iter()).await?
        } else {
            self.bounded_scan().await?
        };

        Ok(assets
            .into_iter()
            .filter(|asset| matches_query(asset, query))
            .collect())
    }

    /// Full scan of the metadata prefix, capped at the max page size.
    async fn bounded_scan(&self) -> IndexResult<Vec<MediaAsset>> {
        let keys = self.kv.list(keys::METADATA_KEY_PREFIX).await?;
        if keys.len() > self.max_page_size {
            tracing::warn!(
                total = keys.len(),
                cap = self.max_page_size,
                "Unfiltered search truncated to max page size"
            );
        }
        let mut assets = Vec::new();
        for key in keys.into_iter().take(self.max_page_size) {
            if let Some(raw) = self.kv.get(&key).await? {
                let asset: MediaAsset = serde_json::from_str(&raw)?;
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    async fn load_assets(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> IndexResult<Vec<MediaAsset>> {
        let mut assets = Vec::new();
        for id in ids {
            match self.kv.get(&keys::metadata_key(id)).await? {
                Some(raw) => assets.push(serde_json::from_str(&raw)?),
                // Stale index entry: the record is gone, skip it.
                None => tracing::debug!(asset_id = %id, "Index entry without metadata record"),
            }
        }
        Ok(assets)
    }

    fn page_bounds(&self, query: &SearchQuery) -> (usize, usize) {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(self.max_page_size);
        (limit, query.offset.unwrap_or(0))
    }

    async fn read_id_set(&self, key: &str) -> IndexResult<BTreeSet<Uuid>> {
        match self.kv.get(key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn add_to_set(&self, key: &str, id: Uuid) -> IndexResult<()> {
        let mut ids = self.read_id_set(key).await?;
        if ids.insert(id) {
            self.kv
                .put(key, serde_json::to_string(&ids)?, None)
                .await?;
        }
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, id: Uuid) -> IndexResult<()> {
        let mut ids = self.read_id_set(key).await?;
        if ids.remove(&id) {
            if ids.is_empty() {
                self.kv.delete(key).await?;
            } else {
                self.kv
                    .put(key, serde_json::to_string(&ids)?, None)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Predicate pass applied after index lookup. Tags keep the index's union
/// semantics: any requested tag matches.
fn matches_query(asset: &MediaAsset, query: &SearchQuery) -> bool {
    if asset.deleted {
        return false;
    }
    if !query.tags.is_empty() && !query.tags.iter().any(|t| asset.tags.contains(t)) {
        return false;
    }
    if let Some(owner_id) = query.owner_id {
        if asset.owner_id != owner_id {
            return false;
        }
    }
    if let Some(category) = &query.category {
        if asset.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if !query.formats.is_empty() && !query.formats.iter().any(|f| f == &asset.format) {
        return false;
    }
    if let Some(visibility) = query.visibility {
        if asset.visibility != visibility {
            return false;
        }
    }
    if let Some(min) = query.min_size_bytes {
        if asset.size_bytes < min {
            return false;
        }
    }
    if let Some(max) = query.max_size_bytes {
        if asset.size_bytes > max {
            return false;
        }
    }
    if let Some(min) = query.min_width {
        if asset.width < min {
            return false;
        }
    }
    if let Some(max) = query.max_width {
        if asset.width > max {
            return false;
        }
    }
    if let Some(min) = query.min_height {
        if asset.height < min {
            return false;
        }
    }
    if let Some(max) = query.max_height {
        if asset.height > max {
            return false;
        }
    }
    if let Some(after) = query.created_after {
        if asset.created_at < after {
            return false;
        }
    }
    if let Some(before) = query.created_before {
        if asset.created_at > before {
            return false;
        }
    }
    true
}

fn sort_assets(assets: &mut [MediaAsset], sort_by: Option<SortBy>, sort_order: Option<SortOrder>) {
    let sort_by = sort_by.unwrap_or(SortBy::CreatedAt);
    let sort_order = sort_order.unwrap_or(SortOrder::Desc);
    assets.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortBy::SizeBytes => a.size_bytes.cmp(&b.size_bytes),
            SortBy::FileName => a.file_name.cmp(&b.file_name),
        };
        match sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Facet counts over a candidate set. Formats/tags/categories are sorted by
/// count descending, then value; size buckets keep the fixed bucket order.
fn compute_facets(assets: &[MediaAsset]) -> Facets {
    let mut formats: BTreeMap<&str, usize> = BTreeMap::new();
    let mut tags: BTreeMap<&str, usize> = BTreeMap::new();
    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
    let mut sizes: BTreeMap<&str, usize> = BTreeMap::new();

    for asset in assets {
        *formats.entry(asset.format.as_str()).or_default() += 1;
        for tag in &asset.tags {
            *tags.entry(tag.as_str()).or_default() += 1;
        }
        if let Some(category) = &asset.category {
            *categories.entry(category.as_str()).or_default() += 1;
        }
        *sizes.entry(size_bucket_label(asset.size_bytes)).or_default() += 1;
    }

    Facets {
        formats: by_count(formats),
        tags: by_count(tags),
        categories: by_count(categories),
        sizes: SIZE_BUCKETS
            .iter()
            .filter_map(|(label, _, _)| {
                sizes.get(label).map(|&count| FacetCount {
                    value: label.to_string(),
                    count,
                })
            })
            .collect(),
    }
}

fn by_count(counts: BTreeMap<&str, usize>) -> Vec<FacetCount> {
    let mut out: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out
}
