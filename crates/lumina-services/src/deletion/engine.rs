//! Cascade deletion engine
//!
//! Single-asset state machine: `Planned -> Executing -> {Succeeded,
//! PartiallyFailed}`, with `RollbackAttempted` entered only when a critical
//! step fails. Critical steps are main-object byte removal and record
//! removal; variant byte deletion and cache invalidation collect errors
//! without flipping the success flag.
//!
//! Rollback is deliberately best-effort: deleted bytes cannot be restored,
//! so the engine rewrites the metadata record to match what actually remains
//! in storage and logs what an operator would have to repair by hand. The
//! `rollback_possible` flag goes false only when that attempt itself fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use lumina_cache::Cache;
use lumina_core::models::{
    Actor, BatchDeletionResult, BatchDeletionSummary, DeletionOptions, DeletionPlan,
    DeletionResult, DeletionState,
};
use lumina_core::{AppError, Config};
use lumina_index::{keys as index_keys, MetadataStore};
use lumina_storage::ObjectStorage;

use crate::access::AccessController;
use crate::deletion::references::ReferenceStore;
use crate::rate_limit::RateLimiter;

pub struct DeletionEngine {
    storage: Arc<dyn ObjectStorage>,
    metadata: Arc<MetadataStore>,
    cache: Arc<dyn Cache>,
    references: Arc<dyn ReferenceStore>,
    access: Arc<AccessController>,
    rate_limiter: Arc<RateLimiter>,
    config: Config,
}

impl DeletionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        metadata: Arc<MetadataStore>,
        cache: Arc<dyn Cache>,
        references: Arc<dyn ReferenceStore>,
        access: Arc<AccessController>,
        rate_limiter: Arc<RateLimiter>,
        config: Config,
    ) -> Self {
        DeletionEngine {
            storage,
            metadata,
            cache,
            references,
            access,
            rate_limiter,
            config,
        }
    }

    /// Load everything a deletion would touch, ownership-checked, without
    /// side effects.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, actor_id = %actor.id))]
    pub async fn plan(&self, asset_id: Uuid, actor: &Actor) -> Result<DeletionPlan, AppError> {
        let asset = self
            .metadata
            .get(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", asset_id)))?;

        self.access
            .validate_delete(actor, &asset.storage_key, Some(asset.owner_id))
            .await?;

        let referencing_posts = self.references.posts_referencing(asset_id).await?;
        let referencing_drafts = self.references.drafts_referencing(asset_id).await?;

        let mut warnings = Vec::new();
        if asset.variants.len() > self.config.variant_warning_threshold {
            warnings.push(format!(
                "Asset has {} variants, above the warning threshold of {}",
                asset.variants.len(),
                self.config.variant_warning_threshold
            ));
        }
        let reference_count = referencing_posts.len() + referencing_drafts.len();
        if reference_count > 0 {
            warnings.push(format!(
                "Asset is still referenced by {} post(s) and {} draft(s)",
                referencing_posts.len(),
                referencing_drafts.len()
            ));
        }

        let estimated_steps = 1 + asset.variants.len() + reference_count;
        let variants = asset.variants.clone();

        Ok(DeletionPlan {
            asset,
            variants,
            referencing_posts,
            referencing_drafts,
            warnings,
            estimated_steps,
        })
    }

    /// Delete a single asset. Rate-limit rejections surface as errors;
    /// everything past that gate is reported through the result, including
    /// not-found and authorization failures.
    pub async fn execute(
        &self,
        asset_id: Uuid,
        actor: &Actor,
        options: DeletionOptions,
    ) -> Result<DeletionResult, AppError> {
        let decision = self
            .rate_limiter
            .check(actor.id, "delete", self.config.delete_rate_limit)
            .await;
        if !decision.allowed {
            return Err(AppError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }
        Ok(self.execute_inner(asset_id, actor, options).await)
    }

    /// Delete many assets in fixed-size concurrent batches with a short
    /// inter-batch delay to bound load on shared backends. A per-id failure
    /// becomes a failed result, never an abort.
    #[tracing::instrument(skip(self, asset_ids), fields(actor_id = %actor.id, total = asset_ids.len()))]
    pub async fn execute_batch(
        &self,
        asset_ids: &[Uuid],
        actor: &Actor,
        options: DeletionOptions,
    ) -> Result<BatchDeletionResult, AppError> {
        let decision = self
            .rate_limiter
            .check(actor.id, "delete", self.config.delete_rate_limit)
            .await;
        if !decision.allowed {
            return Err(AppError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }

        let mut results: Vec<DeletionResult> = Vec::with_capacity(asset_ids.len());
        let chunks: Vec<&[Uuid]> = asset_ids.chunks(self.config.deletion_batch_size).collect();
        let last_chunk = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let batch = chunk
                .iter()
                .map(|id| self.execute_inner(*id, actor, options));
            results.extend(join_all(batch).await);

            if i < last_chunk && self.config.deletion_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.deletion_batch_delay_ms))
                    .await;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        let summary = BatchDeletionSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        };
        tracing::info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "Batch deletion completed"
        );
        Ok(BatchDeletionResult { summary, results })
    }

    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, actor_id = %actor.id, dry_run = options.dry_run))]
    async fn execute_inner(
        &self,
        asset_id: Uuid,
        actor: &Actor,
        options: DeletionOptions,
    ) -> DeletionResult {
        let plan = match self.plan(asset_id, actor).await {
            Ok(plan) => plan,
            Err(e) => {
                // Already-deleted assets land here as a not-found: a failed
                // result, never a crash, so repeated deletes are idempotent.
                tracing::warn!(error = %e, asset_id = %asset_id, "Deletion rejected at planning");
                return DeletionResult::rejected(asset_id, e.to_string());
            }
        };

        if options.dry_run {
            return DeletionResult {
                asset_id,
                state: DeletionState::Planned,
                success: true,
                deleted_variants: Vec::new(),
                main_object_deleted: false,
                record_deleted: false,
                errors: Vec::new(),
                rollback_possible: true,
                dry_run: true,
                estimated_steps: Some(plan.estimated_steps),
            };
        }

        let mut result = DeletionResult {
            asset_id,
            state: DeletionState::Executing,
            success: false,
            deleted_variants: Vec::new(),
            main_object_deleted: false,
            record_deleted: false,
            errors: Vec::new(),
            rollback_possible: true,
            dry_run: false,
            estimated_steps: Some(plan.estimated_steps),
        };

        // Step 1: repair referencing entities, unless preserved. Non-critical.
        if !options.preserve_references && plan.reference_count() > 0 {
            match self.references.clear_references(asset_id).await {
                Ok(cleared) => {
                    tracing::info!(asset_id = %asset_id, cleared, "Cleared asset references");
                }
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to clear references: {}", e));
                }
            }
        }

        // Step 2: variant bytes. Per-variant errors are collected, the batch
        // keeps going.
        for variant in &plan.variants {
            match self.storage.delete(&variant.storage_key).await {
                Ok(()) => result.deleted_variants.push(variant.id),
                Err(e) => result.errors.push(format!(
                    "Failed to delete variant {} ({}): {}",
                    variant.id, variant.storage_key, e
                )),
            }
        }

        // Step 3: main object bytes. Critical.
        if let Err(e) = self.storage.delete(&plan.asset.storage_key).await {
            result.errors.push(format!(
                "Failed to delete main object {}: {}",
                plan.asset.storage_key, e
            ));
            return self.rollback(&plan, result).await;
        }
        result.main_object_deleted = true;

        // Steps 4-5: metadata record, soft or hard. Critical.
        let record_step: Result<(), AppError> = if options.soft_delete {
            let mut snapshot = plan.asset.clone();
            snapshot.deleted = true;
            snapshot
                .variants
                .retain(|v| !result.deleted_variants.contains(&v.id));
            snapshot.updated_at = Utc::now();
            self.metadata
                .store(&snapshot)
                .await
                .map_err(AppError::from)
        } else {
            self.metadata.delete(asset_id).await.map_err(AppError::from)
        };
        if let Err(e) = record_step {
            result
                .errors
                .push(format!("Failed to remove metadata record: {}", e));
            return self.rollback(&plan, result).await;
        }
        result.record_deleted = true;

        // Step 6: cache invalidation for the asset id and its storage key.
        // Failures are recorded but non-critical.
        if let Err(e) = self.cache.delete(&index_keys::metadata_key(asset_id)).await {
            result
                .errors
                .push(format!("Failed to drop metadata cache entry: {}", e));
        }
        if let Err(e) = self
            .cache
            .invalidate_pattern(&format!("{}*", plan.asset.storage_key))
            .await
        {
            result
                .errors
                .push(format!("Failed to invalidate derived cache entries: {}", e));
        }

        result.success = true;
        result.state = if result.errors.is_empty() {
            DeletionState::Succeeded
        } else {
            DeletionState::PartiallyFailed
        };
        tracing::info!(
            asset_id = %asset_id,
            state = ?result.state,
            deleted_variants = result.deleted_variants.len(),
            errors = result.errors.len(),
            "Cascade deletion finished"
        );
        result
    }

    /// Best-effort rollback after a critical failure. Bytes already deleted
    /// cannot be restored; the record is rewritten to match what remains so
    /// the system stays internally consistent, and the rest is logged for
    /// manual repair.
    async fn rollback(&self, plan: &DeletionPlan, mut result: DeletionResult) -> DeletionResult {
        result.state = DeletionState::RollbackAttempted;
        result.success = false;
        tracing::error!(
            asset_id = %plan.asset.id,
            "Critical deletion step failed, attempting best-effort rollback"
        );

        let mut snapshot = plan.asset.clone();
        snapshot
            .variants
            .retain(|v| !result.deleted_variants.contains(&v.id));
        snapshot.updated_at = Utc::now();

        match self.metadata.store(&snapshot).await {
            Ok(()) => {
                for variant_id in &result.deleted_variants {
                    tracing::warn!(
                        asset_id = %plan.asset.id,
                        variant_id = %variant_id,
                        "Variant bytes already deleted; restore requires manual repair"
                    );
                }
            }
            Err(e) => {
                result.rollback_possible = false;
                result.errors.push(format!("Rollback failed: {}", e));
                tracing::error!(
                    error = %e,
                    asset_id = %plan.asset.id,
                    "Rollback itself failed; manual intervention required"
                );
            }
        }
        result
    }
}
