use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a previously deactivated assignment is reactivated.
    RoleReactivated,
    /// Emitted when a role assignment is deactivated.
    RoleRemoved,
    /// Emitted when a user's role set is replaced wholesale.
    RolesSynced,
    /// Emitted when a role row is purged by an administrator.
    RoleDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleAssigned => "roles.assigned",
            Self::RoleReactivated => "roles.reactivated",
            Self::RoleRemoved => "roles.removed",
            Self::RolesSynced => "roles.synced",
            Self::RoleDeleted => "roles.deleted",
        }
    }
}
