use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified identity attached to every request.
///
/// Authentication happens upstream; this subsystem only ever authorizes an
/// already-verified actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: String,
}

impl Actor {
    pub fn new(id: Uuid, role: impl Into<String>) -> Self {
        Actor {
            id,
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    Allow,
    Deny,
}

/// A condition attached to an access policy.
///
/// Policies loaded from external configuration may carry condition kinds this
/// build does not understand; those deserialize as `Unknown` and cause a
/// conservative deny during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PolicyCondition {
    /// The resource path must embed the actor's id per the storage-key
    /// naming convention (`images/{ownerId}_...`).
    Ownership,
    /// Actor role must equal one of the listed roles.
    #[serde(rename = "role")]
    RoleMembership { roles: Vec<String> },
    /// Numeric context value (e.g. upload size) must not exceed the limit.
    SizeLimit { max_bytes: u64 },
    #[serde(other)]
    Unknown,
}

/// An ordered access policy: first applicable match wins, default deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Literal resource path or trailing-wildcard prefix (`images/*`).
    pub resource_pattern: String,
    /// Exact action name or `*`.
    pub action: String,
    pub effect: PolicyEffect,
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
}

impl AccessPolicy {
    pub fn new(
        resource_pattern: impl Into<String>,
        action: impl Into<String>,
        effect: PolicyEffect,
    ) -> Self {
        AccessPolicy {
            resource_pattern: resource_pattern.into(),
            action: action.into(),
            effect,
            conditions: Vec::new(),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<PolicyCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Pattern match: exact, or trailing-wildcard prefix.
    pub fn matches_resource(&self, resource: &str) -> bool {
        if let Some(prefix) = self.resource_pattern.strip_suffix('*') {
            resource.starts_with(prefix)
        } else {
            self.resource_pattern == resource
        }
    }

    /// Action match: exact or wildcard.
    pub fn matches_action(&self, action: &str) -> bool {
        self.action == "*" || self.action == action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_match() {
        let policy = AccessPolicy::new("images/abc", "read", PolicyEffect::Allow);
        assert!(policy.matches_resource("images/abc"));
        assert!(!policy.matches_resource("images/abcd"));
    }

    #[test]
    fn test_wildcard_pattern_match() {
        let policy = AccessPolicy::new("images/*", "read", PolicyEffect::Allow);
        assert!(policy.matches_resource("images/abc"));
        assert!(policy.matches_resource("images/"));
        assert!(!policy.matches_resource("videos/abc"));
    }

    #[test]
    fn test_action_wildcard() {
        let policy = AccessPolicy::new("images/*", "*", PolicyEffect::Deny);
        assert!(policy.matches_action("read"));
        assert!(policy.matches_action("delete"));
    }

    #[test]
    fn test_unknown_condition_deserializes() {
        let json = r#"{"kind":"geo-fence","region":"eu"}"#;
        let condition: PolicyCondition = serde_json::from_str(json).unwrap();
        assert_eq!(condition, PolicyCondition::Unknown);
    }
}
