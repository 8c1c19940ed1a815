use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::asset::Visibility;

/// Request to issue a presigned URL for a direct-to-storage upload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadUrlRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared file size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub size_bytes: u64,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Private
}

/// Response containing the presigned upload URL and the reserved asset id
#[derive(Debug, Clone, Serialize)]
pub struct UploadUrlResponse {
    /// Asset id reserved for this upload (used to confirm completion)
    pub id: Uuid,
    /// Presigned URL for the direct PUT upload
    pub upload_url: String,
    /// Storage key where the object will land
    pub storage_key: String,
    /// URL expiration time
    pub expires_at: DateTime<Utc>,
}
