use serde::Serialize;

use crate::Permission;

/// Detail attached to a denial so callers and operators can see what was
/// missing.
///
/// Exposing the caller's roles and the required permission is a deliberate
/// transparency trade-off: it aids legitimate users at the cost of richer
/// probing responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionDenial {
    /// Human-readable denial reason.
    pub reason: String,
    /// Active roles held by the caller.
    pub user_roles: Vec<String>,
    /// Permission the request required.
    pub required_permission: Permission,
}

/// Verdict produced by the access decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum AccessDecision {
    /// Caller may perform the action.
    Allow,
    /// Caller is blocked by policy.
    Deny(DecisionDenial),
    /// Targeted resource does not exist.
    ///
    /// Kept distinct from [`AccessDecision::Deny`] so a missing resource
    /// answers 404 instead of leaking existence through a uniform 403.
    NotFound,
}

impl AccessDecision {
    /// Returns whether the decision permits the action.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Creates a denial verdict.
    #[must_use]
    pub fn deny(
        reason: impl Into<String>,
        user_roles: Vec<String>,
        required_permission: Permission,
    ) -> Self {
        Self::Deny(DecisionDenial {
            reason: reason.into(),
            user_roles,
            required_permission,
        })
    }
}
