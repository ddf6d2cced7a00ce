use std::collections::BTreeSet;

use crate::Permission;

/// Role whose holders bypass context refinement entirely.
pub const ADMIN_ROLE: &str = "admin";

/// Role granted to users who own and run projects.
pub const PROJECT_OWNER_ROLE: &str = "project_owner";

/// Role granted to users who work on assigned tasks.
pub const TASK_OWNER_ROLE: &str = "task_owner";

/// Baseline role for read-mostly collaborators.
pub const MEMBER_ROLE: &str = "member";

const PROJECT_OWNER_PERMISSIONS: &[Permission] = &[
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
    Permission::UsersList,
    Permission::RolesAssign,
    Permission::RolesRead,
];

const TASK_OWNER_PERMISSIONS: &[Permission] = &[
    Permission::ProjectsRead,
    Permission::ProjectsList,
    Permission::TasksCreate,
    Permission::TasksRead,
    Permission::TasksUpdate,
    Permission::TasksList,
    Permission::FilesUpload,
    Permission::FilesRead,
    Permission::FilesList,
];

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::ProjectsRead,
    Permission::ProjectsList,
    Permission::TasksRead,
    Permission::TasksList,
    Permission::FilesRead,
    Permission::FilesList,
    Permission::UsersRead,
];

/// Static catalog mapping role names to permission grants.
///
/// The catalog is a configuration artifact, not stored data: role rows in
/// the database carry names only and expand through this table. Unknown
/// names degrade to the empty grant set so a stale role row can never fail
/// a request.
pub struct RoleCatalog;

impl RoleCatalog {
    /// Returns the permission grants for one role name.
    #[must_use]
    pub fn permissions_of(role_name: &str) -> &'static [Permission] {
        match role_name {
            ADMIN_ROLE => Permission::all(),
            PROJECT_OWNER_ROLE => PROJECT_OWNER_PERMISSIONS,
            TASK_OWNER_ROLE => TASK_OWNER_PERMISSIONS,
            MEMBER_ROLE => MEMBER_PERMISSIONS,
            _ => &[],
        }
    }

    /// Expands role names into the union of their permission grants.
    #[must_use]
    pub fn expand<'a>(role_names: impl IntoIterator<Item = &'a str>) -> BTreeSet<Permission> {
        role_names
            .into_iter()
            .flat_map(|role_name| Self::permissions_of(role_name).iter().copied())
            .collect()
    }

    /// Returns all role names the catalog knows about.
    #[must_use]
    pub fn known_roles() -> &'static [&'static str] {
        &[ADMIN_ROLE, PROJECT_OWNER_ROLE, TASK_OWNER_ROLE, MEMBER_ROLE]
    }
}

#[cfg(test)]
mod tests {
    use crate::Permission;

    use super::{PROJECT_OWNER_ROLE, RoleCatalog, TASK_OWNER_ROLE};

    #[test]
    fn unknown_role_expands_to_empty_set() {
        assert!(RoleCatalog::permissions_of("intern").is_empty());
        assert!(RoleCatalog::expand(["intern"]).is_empty());
    }

    #[test]
    fn expansion_is_the_set_union_of_role_grants() {
        let combined = RoleCatalog::expand([TASK_OWNER_ROLE, PROJECT_OWNER_ROLE]);

        let mut expected = std::collections::BTreeSet::new();
        expected.extend(RoleCatalog::permissions_of(TASK_OWNER_ROLE).iter().copied());
        expected.extend(
            RoleCatalog::permissions_of(PROJECT_OWNER_ROLE)
                .iter()
                .copied(),
        );

        assert_eq!(combined, expected);
    }

    #[test]
    fn admin_holds_every_permission() {
        let expanded = RoleCatalog::expand(["admin"]);
        assert_eq!(expanded.len(), Permission::all().len());
    }

    #[test]
    fn task_owner_may_update_tasks() {
        assert!(RoleCatalog::expand([TASK_OWNER_ROLE]).contains(&Permission::TasksUpdate));
    }
}
