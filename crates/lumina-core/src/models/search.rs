use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::{MediaAsset, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    CreatedAt,
    UpdatedAt,
    SizeBytes,
    FileName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search query over the media index.
///
/// Tag and owner filters hit the inverted indexes; everything else is applied
/// as an in-memory predicate pass over the candidate set before pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: Option<Uuid>,
    pub category: Option<String>,
    #[serde(default)]
    pub formats: Vec<String>,
    pub visibility: Option<Visibility>,
    pub min_size_bytes: Option<u64>,
    pub max_size_bytes: Option<u64>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            tags: Vec::new(),
            owner_id: None,
            category: None,
            formats: Vec::new(),
            visibility: None,
            min_size_bytes: None,
            max_size_bytes: None,
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            created_after: None,
            created_before: None,
            limit: None,
            offset: None,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl SearchQuery {
    /// Whether the query carries at least one indexed filter (tag or owner).
    /// Without one the index falls back to a bounded full scan.
    pub fn has_indexed_filter(&self) -> bool {
        !self.tags.is_empty() || self.owner_id.is_some()
    }
}

/// A single facet bucket: field value and result count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Facet counts grouped by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Facets {
    pub formats: Vec<FacetCount>,
    pub tags: Vec<FacetCount>,
    pub categories: Vec<FacetCount>,
    /// Size buckets in the fixed `SIZE_BUCKETS` order, never lexicographic.
    pub sizes: Vec<FacetCount>,
}

/// One page of search results plus facets over the full candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<MediaAsset>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub facets: Facets,
}

/// Human-readable size buckets: label and half-open byte range
/// `[min, max)`; `u64::MAX` marks the unbounded top bucket.
pub const SIZE_BUCKETS: &[(&str, u64, u64)] = &[
    ("<100KB", 0, 100 * 1024),
    ("100KB-500KB", 100 * 1024, 500 * 1024),
    ("500KB-1MB", 500 * 1024, 1024 * 1024),
    ("1MB-5MB", 1024 * 1024, 5 * 1024 * 1024),
    ("5MB-10MB", 5 * 1024 * 1024, 10 * 1024 * 1024),
    (">10MB", 10 * 1024 * 1024, u64::MAX),
];

/// Bucket label for a byte size, per `SIZE_BUCKETS`.
pub fn size_bucket_label(size_bytes: u64) -> &'static str {
    for (label, min, max) in SIZE_BUCKETS {
        if size_bytes >= *min && size_bytes < *max {
            return label;
        }
    }
    // Unreachable: the last bucket is unbounded.
    SIZE_BUCKETS[SIZE_BUCKETS.len() - 1].0
}
