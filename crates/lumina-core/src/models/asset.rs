use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::validation::{validate_category, validate_tag, MAX_TAGS};

/// Asset visibility enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Unlisted,
}

/// Kind of transformation recorded in an asset's audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationKind {
    Resize,
    Crop,
    Rotate,
    Filter,
    Enhancement,
}

/// Canonical record for a user-uploaded image.
///
/// Owned exclusively by the uploading user; posts and drafts reference assets
/// but never own them. The `storage_key` is immutable for the lifetime of the
/// asset and globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub mime_type: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub visibility: Visibility,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
    /// Soft-deletion flag: the record is retained but the bytes are purged.
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub variants: Vec<ImageVariant>,
    /// Append-only audit trail of transformations applied to this asset.
    #[serde(default)]
    pub transformations: Vec<TransformationRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaAsset {
    /// Validate the record before any write reaches a durable store.
    ///
    /// Required fields (id, filename, owner, storage key), positive
    /// dimensions and size, bounded tag set. Rejection here guarantees no
    /// side effect has happened yet.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.is_nil() {
            return Err(AppError::Validation("Asset id is required".to_string()));
        }
        if self.owner_id.is_nil() {
            return Err(AppError::Validation("Owner id is required".to_string()));
        }
        if self.file_name.is_empty() || self.file_name.len() > 255 {
            return Err(AppError::Validation(
                "Filename must be between 1 and 255 characters".to_string(),
            ));
        }
        if self.storage_key.is_empty() {
            return Err(AppError::Validation("Storage key is required".to_string()));
        }
        if self.mime_type.is_empty() {
            return Err(AppError::Validation("MIME type is required".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(AppError::Validation(
                "Dimensions must be positive".to_string(),
            ));
        }
        if self.size_bytes == 0 {
            return Err(AppError::Validation(
                "File size must be positive".to_string(),
            ));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(AppError::Validation(format!(
                "At most {} tags are allowed",
                MAX_TAGS
            )));
        }
        for tag in &self.tags {
            validate_tag(tag)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        Ok(())
    }

    /// Apply a partial update in place, refreshing `updated_at`.
    ///
    /// `storage_key`, `id`, and `owner_id` are deliberately not updatable:
    /// the key is immutable for the lifetime of the asset.
    pub fn apply_update(&mut self, update: &MediaAssetUpdate) {
        if let Some(file_name) = &update.file_name {
            self.file_name = file_name.clone();
        }
        if let Some(mime_type) = &update.mime_type {
            self.mime_type = mime_type.clone();
        }
        if let Some(format) = &update.format {
            self.format = format.clone();
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(size_bytes) = update.size_bytes {
            self.size_bytes = size_bytes;
        }
        if let Some(visibility) = update.visibility {
            self.visibility = visibility;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        if let Some(category) = &update.category {
            self.category = if category.is_empty() {
                None
            } else {
                Some(category.clone())
            };
        }
        self.updated_at = Utc::now();
    }

    /// Append one entry to the transformation audit trail, refreshing
    /// `updated_at`. The trail is append-only: existing entries are never
    /// rewritten or removed, and `MediaAssetUpdate` cannot touch it.
    pub fn append_transformation(&mut self, record: TransformationRecord) {
        self.transformations.push(record);
        self.updated_at = Utc::now();
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

/// A resized/reformatted derivative of an asset's original bytes.
///
/// `parent_asset_id` is a back-reference only, never an ownership edge; a
/// variant cannot outlive its parent asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVariant {
    pub id: Uuid,
    pub parent_asset_id: Uuid,
    /// Variant name, e.g. "small" or "medium".
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub quality: u32,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// One entry in an asset's append-only transformation audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRecord {
    pub id: Uuid,
    pub kind: TransformationKind,
    pub parameters: BTreeMap<String, String>,
    pub applied_at: DateTime<Utc>,
    pub applied_by: Uuid,
}

impl TransformationRecord {
    pub fn new(
        kind: TransformationKind,
        parameters: BTreeMap<String, String>,
        applied_by: Uuid,
    ) -> Self {
        TransformationRecord {
            id: Uuid::new_v4(),
            kind,
            parameters,
            applied_at: Utc::now(),
            applied_by,
        }
    }
}

/// Partial update for a media asset; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaAssetUpdate {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: Option<u64>,
    pub visibility: Option<Visibility>,
    pub tags: Option<BTreeSet<String>>,
    /// `Some("")` clears the category.
    pub category: Option<String>,
}
