use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use taskboard_application::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};
use taskboard_core::{AppError, AppResult, UserId};
use taskboard_domain::RoleCatalog;

#[derive(Debug, Clone)]
struct StoredAssignment {
    row_id: Uuid,
    assigned_by: UserId,
    assigned_at: DateTime<Utc>,
    active: bool,
}

/// In-memory role assignment store.
///
/// Mirrors the PostgreSQL store's semantics, including reactivation of
/// existing rows instead of duplicate inserts. Users must be registered
/// before roles can be assigned to them.
#[derive(Debug)]
pub struct InMemoryRoleAssignmentStore {
    users: RwLock<HashSet<Uuid>>,
    roles: RwLock<BTreeSet<String>>,
    assignments: RwLock<HashMap<(Uuid, String), StoredAssignment>>,
}

impl InMemoryRoleAssignmentStore {
    /// Creates a store seeded with the built-in role catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashSet::new()),
            roles: RwLock::new(
                RoleCatalog::known_roles()
                    .iter()
                    .map(|role_name| (*role_name).to_owned())
                    .collect(),
            ),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Makes a user known to the store.
    pub async fn register_user(&self, user_id: UserId) {
        self.users.write().await.insert(user_id.as_uuid());
    }

    async fn require_user(&self, user_id: UserId) -> AppResult<()> {
        if self.users.read().await.contains(&user_id.as_uuid()) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user '{user_id}' was not found")))
        }
    }

    async fn require_role(&self, role_name: &str) -> AppResult<()> {
        if self.roles.read().await.contains(role_name) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "role '{role_name}' was not found"
            )))
        }
    }
}

impl Default for InMemoryRoleAssignmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleAssignmentStore for InMemoryRoleAssignmentStore {
    async fn assign(
        &self,
        user_id: UserId,
        role_name: &str,
        assigned_by: UserId,
    ) -> AppResult<AssignmentOutcome> {
        self.require_user(user_id).await?;
        self.require_role(role_name).await?;

        let mut assignments = self.assignments.write().await;
        let key = (user_id.as_uuid(), role_name.to_owned());

        match assignments.get_mut(&key) {
            Some(stored) if stored.active => Ok(AssignmentOutcome::AlreadyActive),
            Some(stored) => {
                stored.active = true;
                stored.assigned_by = assigned_by;
                stored.assigned_at = Utc::now();
                Ok(AssignmentOutcome::Reactivated)
            }
            None => {
                assignments.insert(
                    key,
                    StoredAssignment {
                        row_id: Uuid::new_v4(),
                        assigned_by,
                        assigned_at: Utc::now(),
                        active: true,
                    },
                );
                Ok(AssignmentOutcome::Created)
            }
        }
    }

    async fn remove(&self, user_id: UserId, role_name: &str) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        if let Some(stored) = assignments.get_mut(&(user_id.as_uuid(), role_name.to_owned())) {
            stored.active = false;
        }

        Ok(())
    }

    async fn sync(
        &self,
        user_id: UserId,
        role_names: &[String],
        assigned_by: UserId,
    ) -> AppResult<()> {
        self.require_user(user_id).await?;
        for role_name in role_names {
            self.require_role(role_name).await?;
        }

        // Single write-lock section stands in for the database transaction.
        let mut assignments = self.assignments.write().await;
        for ((assignment_user, _), stored) in assignments.iter_mut() {
            if *assignment_user == user_id.as_uuid() {
                stored.active = false;
            }
        }

        for role_name in role_names {
            let key = (user_id.as_uuid(), role_name.clone());
            match assignments.get_mut(&key) {
                Some(stored) => {
                    stored.active = true;
                    stored.assigned_by = assigned_by;
                    stored.assigned_at = Utc::now();
                }
                None => {
                    assignments.insert(
                        key,
                        StoredAssignment {
                            row_id: Uuid::new_v4(),
                            assigned_by,
                            assigned_at: Utc::now(),
                            active: true,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    async fn roles_of(&self, user_id: UserId) -> AppResult<Vec<String>> {
        let assignments = self.assignments.read().await;
        let mut roles: Vec<String> = assignments
            .iter()
            .filter(|((assignment_user, _), stored)| {
                *assignment_user == user_id.as_uuid() && stored.active
            })
            .map(|((_, role_name), _)| role_name.clone())
            .collect();
        roles.sort();

        Ok(roles)
    }

    async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool> {
        let assignments = self.assignments.read().await;

        Ok(assignments
            .get(&(user_id.as_uuid(), role_name.to_owned()))
            .is_some_and(|stored| stored.active))
    }

    async fn delete_role(&self, role_name: &str) -> AppResult<()> {
        self.require_role(role_name).await?;

        let mut assignments = self.assignments.write().await;
        let active_count = assignments
            .iter()
            .filter(|((_, assignment_role), stored)| assignment_role == role_name && stored.active)
            .count();
        if active_count > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_name}' still has {active_count} active assignment(s)"
            )));
        }

        assignments.retain(|(_, assignment_role), _| assignment_role != role_name);
        self.roles.write().await.remove(role_name);

        Ok(())
    }

    async fn list_assignments(&self) -> AppResult<Vec<RoleAssignmentRecord>> {
        let assignments = self.assignments.read().await;
        let mut records: Vec<RoleAssignmentRecord> = assignments
            .iter()
            .map(|((assignment_user, role_name), stored)| RoleAssignmentRecord {
                user_id: UserId::from_uuid(*assignment_user),
                role_name: role_name.clone(),
                assigned_by: stored.assigned_by,
                assigned_at: stored.assigned_at,
                active: stored.active,
            })
            .collect();
        records.sort_by(|left, right| {
            (left.user_id.as_uuid(), left.role_name.as_str())
                .cmp(&(right.user_id.as_uuid(), right.role_name.as_str()))
        });

        Ok(records)
    }
}
