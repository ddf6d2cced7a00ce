use std::str::FromStr;

use serde::{Deserialize, Serialize};
use taskboard_core::AppError;

use crate::context::ResourceKind;

/// Permissions enforced by application policy checks.
///
/// The set is closed: wire values parse through [`Permission::from_str`] at
/// the HTTP boundary and typo-class bugs cannot survive compilation inside
/// the process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows creating projects.
    ProjectsCreate,
    /// Allows reading a project instance.
    ProjectsRead,
    /// Allows updating a project instance.
    ProjectsUpdate,
    /// Allows deleting a project instance.
    ProjectsDelete,
    /// Allows listing projects.
    ProjectsList,
    /// Allows creating tasks.
    TasksCreate,
    /// Allows reading a task instance.
    TasksRead,
    /// Allows updating a task instance.
    TasksUpdate,
    /// Allows deleting a task instance.
    TasksDelete,
    /// Allows listing tasks.
    TasksList,
    /// Allows uploading files.
    FilesUpload,
    /// Allows reading a file instance.
    FilesRead,
    /// Allows deleting a file instance.
    FilesDelete,
    /// Allows listing files.
    FilesList,
    /// Allows reading a user profile.
    UsersRead,
    /// Allows updating a user profile.
    UsersUpdate,
    /// Allows listing users.
    UsersList,
    /// Allows assigning and removing roles.
    RolesAssign,
    /// Allows reading role and assignment data.
    RolesRead,
    /// Allows reading audit log entries.
    AuditRead,
}

impl Permission {
    /// Returns the stable `resource:action` token for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectsCreate => "projects:create",
            Self::ProjectsRead => "projects:read",
            Self::ProjectsUpdate => "projects:update",
            Self::ProjectsDelete => "projects:delete",
            Self::ProjectsList => "projects:list",
            Self::TasksCreate => "tasks:create",
            Self::TasksRead => "tasks:read",
            Self::TasksUpdate => "tasks:update",
            Self::TasksDelete => "tasks:delete",
            Self::TasksList => "tasks:list",
            Self::FilesUpload => "files:upload",
            Self::FilesRead => "files:read",
            Self::FilesDelete => "files:delete",
            Self::FilesList => "files:list",
            Self::UsersRead => "users:read",
            Self::UsersUpdate => "users:update",
            Self::UsersList => "users:list",
            Self::RolesAssign => "roles:assign",
            Self::RolesRead => "roles:read",
            Self::AuditRead => "audit:read",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::ProjectsCreate,
            Permission::ProjectsRead,
            Permission::ProjectsUpdate,
            Permission::ProjectsDelete,
            Permission::ProjectsList,
            Permission::TasksCreate,
            Permission::TasksRead,
            Permission::TasksUpdate,
            Permission::TasksDelete,
            Permission::TasksList,
            Permission::FilesUpload,
            Permission::FilesRead,
            Permission::FilesDelete,
            Permission::FilesList,
            Permission::UsersRead,
            Permission::UsersUpdate,
            Permission::UsersList,
            Permission::RolesAssign,
            Permission::RolesRead,
            Permission::AuditRead,
        ];

        ALL
    }

    /// Returns whether this permission is refined against a resource
    /// instance.
    ///
    /// Create and list permissions have no instance to evaluate and are
    /// gated solely on the role-level grant.
    #[must_use]
    pub fn requires_context(&self) -> bool {
        matches!(
            self,
            Self::ProjectsRead
                | Self::ProjectsUpdate
                | Self::ProjectsDelete
                | Self::TasksRead
                | Self::TasksUpdate
                | Self::TasksDelete
                | Self::FilesRead
                | Self::FilesDelete
                | Self::UsersRead
                | Self::UsersUpdate
        )
    }

    /// Returns the resource kind a context must be resolved against, when
    /// the permission is instance-refined.
    #[must_use]
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::ProjectsCreate
            | Self::ProjectsRead
            | Self::ProjectsUpdate
            | Self::ProjectsDelete
            | Self::ProjectsList => Some(ResourceKind::Project),
            Self::TasksCreate
            | Self::TasksRead
            | Self::TasksUpdate
            | Self::TasksDelete
            | Self::TasksList => Some(ResourceKind::Task),
            Self::FilesUpload | Self::FilesRead | Self::FilesDelete | Self::FilesList => {
                Some(ResourceKind::File)
            }
            Self::UsersRead | Self::UsersUpdate | Self::UsersList => Some(ResourceKind::User),
            Self::RolesAssign | Self::RolesRead | Self::AuditRead => None,
        }
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|permission| permission.as_str() == value)
            .copied()
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Permission;

    #[test]
    fn permission_roundtrip_storage_value() {
        for permission in Permission::all() {
            let restored = Permission::from_str(permission.as_str());
            assert_eq!(restored.ok(), Some(*permission));
        }
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let parsed = Permission::from_str("tasks:unknown");
        assert!(parsed.is_err());
    }

    #[test]
    fn create_and_list_permissions_skip_context() {
        assert!(!Permission::TasksCreate.requires_context());
        assert!(!Permission::ProjectsList.requires_context());
        assert!(Permission::TasksUpdate.requires_context());
        assert!(Permission::FilesDelete.requires_context());
    }
}
