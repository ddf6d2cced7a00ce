use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskboard_core::{AppResult, UserId};

/// Result of an assign call.
///
/// Assignment is idempotent: repeating an assign is an informational
/// no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// A new assignment row was inserted.
    Created,
    /// A previously deactivated row was reactivated in place.
    Reactivated,
    /// An active row already existed; nothing changed.
    AlreadyActive,
}

/// Assignment projection mapping a user to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentRecord {
    /// User holding the role.
    pub user_id: UserId,
    /// Role name.
    pub role_name: String,
    /// Administrator who granted the role.
    pub assigned_by: UserId,
    /// Grant (or reactivation) timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Whether the assignment is currently active.
    pub active: bool,
}

/// Port for the persisted many-to-many user/role relation.
///
/// Invariant: at most one row per (user, role) pair. Removal deactivates
/// the row; a later assign reactivates it instead of inserting a
/// duplicate. `sync` must be atomic with respect to concurrent readers of
/// the same user's roles, which implementations achieve with a single
/// database transaction rather than in-process locking.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    /// Grants a role to a user. Fails with `NotFound` when the user or
    /// role does not exist.
    async fn assign(
        &self,
        user_id: UserId,
        role_name: &str,
        assigned_by: UserId,
    ) -> AppResult<AssignmentOutcome>;

    /// Deactivates a role assignment. A missing active assignment is a
    /// no-op, not an error.
    async fn remove(&self, user_id: UserId, role_name: &str) -> AppResult<()>;

    /// Replaces the user's active role set with the given roles. Readers
    /// observe either the pre-sync or the post-sync set, never a mix.
    async fn sync(
        &self,
        user_id: UserId,
        role_names: &[String],
        assigned_by: UserId,
    ) -> AppResult<()>;

    /// Lists active role names for a user, ordered by name.
    async fn roles_of(&self, user_id: UserId) -> AppResult<Vec<String>>;

    /// Returns whether the user holds an active assignment for the role.
    async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool>;

    /// Purges a role row. Rejected with `Conflict` while any active
    /// assignment still references it.
    async fn delete_role(&self, role_name: &str) -> AppResult<()>;

    /// Lists all assignments, active and inactive, for administrative
    /// views.
    async fn list_assignments(&self) -> AppResult<Vec<RoleAssignmentRecord>>;
}
