//! Presigned upload issuance and confirmation
//!
//! Two-step flow: `create_upload_url` reserves an asset id and hands the
//! caller a presigned PUT URL after access, rate-limit, and validation
//! checks; once the client has uploaded directly to storage,
//! `confirm_upload` verifies the object exists and creates the canonical
//! metadata record (which also populates the search indexes).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use lumina_core::models::{Actor, MediaAsset, UploadUrlRequest, UploadUrlResponse};
use lumina_core::validation::validate_tag;
use lumina_core::{AppError, Config};
use lumina_index::MetadataStore;
use lumina_storage::keys::original_key;
use lumina_storage::{ObjectStorage, PresignMethod, StorageError};

use crate::access::AccessController;
use crate::rate_limit::RateLimiter;

pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    metadata: Arc<MetadataStore>,
    access: Arc<AccessController>,
    rate_limiter: Arc<RateLimiter>,
    config: Config,
}

impl UploadService {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        metadata: Arc<MetadataStore>,
        access: Arc<AccessController>,
        rate_limiter: Arc<RateLimiter>,
        config: Config,
    ) -> Self {
        UploadService {
            storage,
            metadata,
            access,
            rate_limiter,
            config,
        }
    }

    /// Issue a presigned upload URL and reserve an asset id for it.
    #[tracing::instrument(skip(self, request), fields(actor_id = %actor.id, file_name = %request.file_name))]
    pub async fn create_upload_url(
        &self,
        actor: &Actor,
        request: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, AppError> {
        let decision = self
            .rate_limiter
            .check(actor.id, "upload", self.config.upload_rate_limit)
            .await;
        if !decision.allowed {
            return Err(AppError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }

        request.validate()?;
        for tag in &request.tags {
            validate_tag(tag)?;
        }

        let storage_key = original_key(actor.id, &request.file_name);
        self.access
            .validate_upload(actor, &storage_key, request.size_bytes)
            .await?;

        let upload_url = self
            .storage
            .create_presigned_url(
                &storage_key,
                PresignMethod::Put,
                Duration::from_secs(self.config.upload_url_expiry_secs),
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let id = Uuid::new_v4();
        let expires_at =
            Utc::now() + chrono::Duration::seconds(self.config.upload_url_expiry_secs as i64);
        tracing::info!(asset_id = %id, storage_key = %storage_key, "Issued presigned upload URL");

        Ok(UploadUrlResponse {
            id,
            upload_url,
            storage_key,
            expires_at,
        })
    }

    /// Confirm a completed upload: verify the object landed in storage, then
    /// create the canonical metadata record. `width`/`height` come from the
    /// caller's post-upload probe of the image.
    #[tracing::instrument(skip(self, request), fields(actor_id = %actor.id, asset_id = %asset_id))]
    pub async fn confirm_upload(
        &self,
        actor: &Actor,
        asset_id: Uuid,
        request: &UploadUrlRequest,
        width: u32,
        height: u32,
    ) -> Result<MediaAsset, AppError> {
        let storage_key = original_key(actor.id, &request.file_name);

        let info = match self.storage.head(&storage_key).await {
            Ok(info) => info,
            Err(StorageError::NotFound(_)) => {
                return Err(AppError::NotFound(format!(
                    "No uploaded object at {}",
                    storage_key
                )));
            }
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };

        let now = Utc::now();
        let asset = MediaAsset {
            id: asset_id,
            owner_id: actor.id,
            file_name: request.file_name.clone(),
            storage_key,
            mime_type: request.content_type.clone(),
            format: format_from_mime(&request.content_type),
            width,
            height,
            size_bytes: info.size_bytes,
            visibility: request.visibility,
            tags: request.tags.iter().cloned().collect::<BTreeSet<String>>(),
            category: request.category.clone(),
            deleted: false,
            variants: Vec::new(),
            transformations: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.metadata.store(&asset).await?;
        tracing::info!(asset_id = %asset.id, size_bytes = asset.size_bytes, "Upload confirmed");
        Ok(asset)
    }
}

/// Image format from a MIME type: `image/jpeg` -> `jpeg`.
fn format_from_mime(content_type: &str) -> String {
    content_type
        .split('/')
        .next_back()
        .unwrap_or(content_type)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_mime() {
        assert_eq!(format_from_mime("image/jpeg"), "jpeg");
        assert_eq!(format_from_mime("image/webp"), "webp");
        assert_eq!(format_from_mime("weird"), "weird");
    }
}
