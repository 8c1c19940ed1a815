use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::{ImageVariant, MediaAsset};

/// Deletion state machine for a single asset:
/// `Planned -> Executing -> {Succeeded, PartiallyFailed}`, with
/// `RollbackAttempted` entered only when a critical step fails. A deletion
/// rejected at planning never leaves `Planned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionState {
    Planned,
    Executing,
    Succeeded,
    PartiallyFailed,
    RollbackAttempted,
}

/// Options controlling a cascade deletion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeletionOptions {
    /// Retain the record, flag it deleted; bytes are still purged. The
    /// default is a hard deletion that removes the record too.
    pub soft_delete: bool,
    /// Skip the reference-repair step on posts/drafts.
    pub preserve_references: bool,
    /// Report the plan estimate and perform no side effects.
    pub dry_run: bool,
}

/// Everything the engine knows before touching any store.
///
/// The estimated step count (1 + variants + references) is surfaced for
/// dry-run confirmation and batching heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub asset: MediaAsset,
    pub variants: Vec<ImageVariant>,
    pub referencing_posts: Vec<Uuid>,
    pub referencing_drafts: Vec<Uuid>,
    pub warnings: Vec<String>,
    pub estimated_steps: usize,
}

impl DeletionPlan {
    pub fn reference_count(&self) -> usize {
        self.referencing_posts.len() + self.referencing_drafts.len()
    }
}

/// Outcome of a single cascade deletion.
///
/// `success` is true only when every critical step (object-byte removal,
/// record removal) succeeded; cache and index invalidation failures are
/// recorded in `errors` without flipping it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionResult {
    pub asset_id: Uuid,
    pub state: DeletionState,
    pub success: bool,
    pub deleted_variants: Vec<Uuid>,
    pub main_object_deleted: bool,
    pub record_deleted: bool,
    pub errors: Vec<String>,
    /// False once the best-effort rollback attempt itself failed; operators
    /// must intervene manually in that case.
    pub rollback_possible: bool,
    pub dry_run: bool,
    pub estimated_steps: Option<usize>,
}

impl DeletionResult {
    /// A deletion rejected before execution started (not found, denied).
    /// The state stays `Planned`: nothing ran, so the Executing terminal
    /// states do not apply and there is nothing to roll back.
    pub fn rejected(asset_id: Uuid, error: impl Into<String>) -> Self {
        DeletionResult {
            asset_id,
            state: DeletionState::Planned,
            success: false,
            deleted_variants: Vec::new(),
            main_object_deleted: false,
            record_deleted: false,
            errors: vec![error.into()],
            rollback_possible: true,
            dry_run: false,
            estimated_steps: None,
        }
    }
}

/// Aggregate counters for a batch deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeletionSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Full batch outcome: summary plus one result per requested id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeletionResult {
    pub summary: BatchDeletionSummary,
    pub results: Vec<DeletionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_result_never_left_planned_state() {
        let id = Uuid::new_v4();
        let result = DeletionResult::rejected(id, "Not found: asset");
        assert!(!result.success);
        assert_eq!(result.state, DeletionState::Planned);
        assert_eq!(result.errors.len(), 1);
        assert!(result.rollback_possible);
    }

    #[test]
    fn test_options_default_is_hard_real_run() {
        let options = DeletionOptions::default();
        assert!(!options.dry_run);
        assert!(!options.soft_delete);
        assert!(!options.preserve_references);
    }
}
