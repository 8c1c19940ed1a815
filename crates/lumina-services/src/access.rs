//! Policy-based access control
//!
//! Evaluation is first-applicable-match over an ordered policy list: the
//! first policy whose resource pattern, action, and conditions all match
//! determines the effect. No match means deny. Unknown condition kinds deny
//! conservatively instead of being skipped.
//!
//! The policy list is owned by the controller instance and mutated only
//! through `add_policy`/`remove_policy`; there is no ambient global state.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use lumina_core::models::{AccessPolicy, Actor, PolicyCondition, PolicyEffect};
use lumina_core::AppError;
use lumina_storage::keys::is_user_owned;

/// Request context consulted by policy conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessContext {
    /// Authoritative owner from the metadata record, when the caller has it.
    /// Conditions fall back to the storage-key naming convention otherwise.
    pub owner_id: Option<Uuid>,
    /// Numeric context for size-limit conditions (declared upload size).
    pub size_bytes: Option<u64>,
}

/// Ordered policy list. First applicable match wins.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    policies: Vec<AccessPolicy>,
}

impl PolicyStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default policy set: admins bypass everything, owners may upload
    /// (within the size limit), download, and delete their own images.
    pub fn with_defaults(max_upload_size_bytes: u64) -> Self {
        let policies = vec![
            AccessPolicy::new("images/*", "*", PolicyEffect::Allow).with_conditions(vec![
                PolicyCondition::RoleMembership {
                    roles: vec!["admin".to_string()],
                },
            ]),
            AccessPolicy::new("images/*", "upload", PolicyEffect::Allow).with_conditions(vec![
                PolicyCondition::Ownership,
                PolicyCondition::SizeLimit {
                    max_bytes: max_upload_size_bytes,
                },
            ]),
            AccessPolicy::new("images/*", "download", PolicyEffect::Allow),
            AccessPolicy::new("images/*", "delete", PolicyEffect::Allow)
                .with_conditions(vec![PolicyCondition::Ownership]),
        ];
        PolicyStore { policies }
    }

    pub fn add_policy(&mut self, policy: AccessPolicy) {
        self.policies.push(policy);
    }

    /// Remove every policy matching the pattern/action pair. Returns how
    /// many were removed.
    pub fn remove_policy(&mut self, resource_pattern: &str, action: &str) -> usize {
        let before = self.policies.len();
        self.policies
            .retain(|p| !(p.resource_pattern == resource_pattern && p.action == action));
        before - self.policies.len()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Evaluates access policies for every request entering the media core.
pub struct AccessController {
    store: Arc<RwLock<PolicyStore>>,
}

impl AccessController {
    pub fn new(store: PolicyStore) -> Self {
        AccessController {
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn add_policy(&self, policy: AccessPolicy) {
        self.store.write().await.add_policy(policy);
    }

    pub async fn remove_policy(&self, resource_pattern: &str, action: &str) -> usize {
        self.store
            .write()
            .await
            .remove_policy(resource_pattern, action)
    }

    /// First-applicable-match evaluation; default deny.
    #[tracing::instrument(skip(self, ctx), fields(actor_id = %actor.id, action = %action, resource = %resource))]
    pub async fn check_permission(
        &self,
        actor: &Actor,
        action: &str,
        resource: &str,
        ctx: &AccessContext,
    ) -> Result<(), AppError> {
        let store = self.store.read().await;
        for policy in &store.policies {
            if !policy.matches_resource(resource) || !policy.matches_action(action) {
                continue;
            }
            match evaluate_conditions(&policy.conditions, actor, resource, ctx) {
                ConditionOutcome::Satisfied => {
                    return match policy.effect {
                        PolicyEffect::Allow => Ok(()),
                        PolicyEffect::Deny => Err(denied(actor, action, resource)),
                    };
                }
                ConditionOutcome::Unsatisfied => continue,
                ConditionOutcome::UnknownKind => {
                    tracing::warn!(
                        resource_pattern = %policy.resource_pattern,
                        "Policy carries an unknown condition kind, denying"
                    );
                    return Err(denied(actor, action, resource));
                }
            }
        }
        Err(denied(actor, action, resource))
    }

    /// Semantic guard for upload issuance.
    pub async fn validate_upload(
        &self,
        actor: &Actor,
        storage_key: &str,
        size_bytes: u64,
    ) -> Result<(), AppError> {
        let ctx = AccessContext {
            owner_id: None,
            size_bytes: Some(size_bytes),
        };
        self.check_permission(actor, "upload", storage_key, &ctx)
            .await
    }

    /// Semantic guard for reads.
    pub async fn validate_download(
        &self,
        actor: &Actor,
        storage_key: &str,
        owner_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let ctx = AccessContext {
            owner_id,
            size_bytes: None,
        };
        self.check_permission(actor, "download", storage_key, &ctx)
            .await
    }

    /// Semantic guard for destructive operations.
    pub async fn validate_delete(
        &self,
        actor: &Actor,
        storage_key: &str,
        owner_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let ctx = AccessContext {
            owner_id,
            size_bytes: None,
        };
        self.check_permission(actor, "delete", storage_key, &ctx)
            .await
    }
}

enum ConditionOutcome {
    Satisfied,
    Unsatisfied,
    UnknownKind,
}

fn evaluate_conditions(
    conditions: &[PolicyCondition],
    actor: &Actor,
    resource: &str,
    ctx: &AccessContext,
) -> ConditionOutcome {
    for condition in conditions {
        let holds = match condition {
            PolicyCondition::Ownership => match ctx.owner_id {
                // Metadata record wins; the key convention is the fallback.
                Some(owner_id) => owner_id == actor.id,
                None => is_user_owned(resource, actor.id),
            },
            PolicyCondition::RoleMembership { roles } => roles.iter().any(|r| r == &actor.role),
            PolicyCondition::SizeLimit { max_bytes } => match ctx.size_bytes {
                Some(size) => size <= *max_bytes,
                None => false,
            },
            PolicyCondition::Unknown => return ConditionOutcome::UnknownKind,
        };
        if !holds {
            return ConditionOutcome::Unsatisfied;
        }
    }
    ConditionOutcome::Satisfied
}

fn denied(actor: &Actor, action: &str, resource: &str) -> AppError {
    AppError::Authorization(format!(
        "Actor {} is not allowed to {} {}",
        actor.id, action, resource
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_storage::keys::original_key;

    fn controller() -> AccessController {
        AccessController::new(PolicyStore::with_defaults(25 * 1024 * 1024))
    }

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), "user")
    }

    // ====== DEFAULT POLICIES ======

    #[tokio::test]
    async fn test_owner_can_upload_within_size_limit() {
        let controller = controller();
        let actor = user();
        let key = original_key(actor.id, "pic.jpg");
        assert!(controller
            .validate_upload(&actor, &key, 1024)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_oversized_upload_denied() {
        let controller = controller();
        let actor = user();
        let key = original_key(actor.id, "pic.jpg");
        let result = controller
            .validate_upload(&actor, &key, 100 * 1024 * 1024)
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete() {
        let controller = controller();
        let owner = user();
        let stranger = user();
        let key = original_key(owner.id, "pic.jpg");
        assert!(controller
            .validate_delete(&owner, &key, Some(owner.id))
            .await
            .is_ok());
        assert!(controller
            .validate_delete(&stranger, &key, Some(owner.id))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_admin_bypasses_ownership() {
        let controller = controller();
        let owner = user();
        let admin = Actor::new(Uuid::new_v4(), "admin");
        let key = original_key(owner.id, "pic.jpg");
        assert!(controller
            .validate_delete(&admin, &key, Some(owner.id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_default_deny_when_no_policy_matches() {
        let controller = AccessController::new(PolicyStore::empty());
        let actor = user();
        let result = controller
            .check_permission(&actor, "read", "videos/clip.mp4", &AccessContext::default())
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    // ====== EVALUATION ORDER ======

    #[tokio::test]
    async fn test_first_applicable_match_wins() {
        let mut store = PolicyStore::empty();
        store.add_policy(AccessPolicy::new("images/*", "download", PolicyEffect::Deny));
        store.add_policy(AccessPolicy::new(
            "images/*",
            "download",
            PolicyEffect::Allow,
        ));
        let controller = AccessController::new(store);
        let actor = user();
        // The deny comes first, so the later allow never applies.
        assert!(controller
            .validate_download(&actor, "images/x.jpg", None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unsatisfied_conditions_fall_through() {
        let mut store = PolicyStore::empty();
        store.add_policy(
            AccessPolicy::new("images/*", "download", PolicyEffect::Deny).with_conditions(vec![
                PolicyCondition::RoleMembership {
                    roles: vec!["banned".to_string()],
                },
            ]),
        );
        store.add_policy(AccessPolicy::new(
            "images/*",
            "download",
            PolicyEffect::Allow,
        ));
        let controller = AccessController::new(store);
        let actor = user();
        // Actor is not banned, so the deny's conditions fail and evaluation
        // continues to the allow.
        assert!(controller
            .validate_download(&actor, "images/x.jpg", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_condition_kind_denies() {
        let mut store = PolicyStore::empty();
        store.add_policy(
            AccessPolicy::new("images/*", "*", PolicyEffect::Allow)
                .with_conditions(vec![PolicyCondition::Unknown]),
        );
        let controller = AccessController::new(store);
        let actor = user();
        assert!(controller
            .validate_download(&actor, "images/x.jpg", None)
            .await
            .is_err());
    }

    // ====== OWNERSHIP SOURCES ======

    #[tokio::test]
    async fn test_metadata_owner_overrides_key_convention() {
        let controller = controller();
        let actor = user();
        // Key names a different owner, but the metadata record says the
        // actor owns it; the record wins.
        let key = original_key(Uuid::new_v4(), "pic.jpg");
        assert!(controller
            .validate_delete(&actor, &key, Some(actor.id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_key_convention_fallback() {
        let controller = controller();
        let actor = user();
        let key = original_key(actor.id, "pic.jpg");
        assert!(controller.validate_delete(&actor, &key, None).await.is_ok());
    }

    // ====== MUTATION ======

    #[tokio::test]
    async fn test_add_and_remove_policy() {
        let controller = AccessController::new(PolicyStore::empty());
        let actor = user();

        controller
            .add_policy(AccessPolicy::new(
                "images/*",
                "download",
                PolicyEffect::Allow,
            ))
            .await;
        assert!(controller
            .validate_download(&actor, "images/x.jpg", None)
            .await
            .is_ok());

        let removed = controller.remove_policy("images/*", "download").await;
        assert_eq!(removed, 1);
        assert!(controller
            .validate_download(&actor, "images/x.jpg", None)
            .await
            .is_err());
    }
}
