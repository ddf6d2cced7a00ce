use std::sync::Arc;

use serde_json::json;
use taskboard_core::{AppResult, UserId};
use taskboard_domain::{AuditAction, Permission, RoleCatalog};

use crate::access_control::RequestAuthzView;
use crate::audit::{AuditEvent, AuditSink, ClientMeta};
use crate::role_assignment::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};

/// Role definition projection combining the stored role with its catalog
/// grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleView {
    /// Role name.
    pub name: String,
    /// Effective grants from the static catalog.
    pub permissions: Vec<Permission>,
}

/// Application service for role assignment administration.
///
/// Every mutation is guarded on `roles:assign` and emits a detached audit
/// event after the store write commits.
#[derive(Clone)]
pub struct RoleAdminService {
    store: Arc<dyn RoleAssignmentStore>,
    audit: AuditSink,
}

impl RoleAdminService {
    /// Creates a service from its collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn RoleAssignmentStore>, audit: AuditSink) -> Self {
        Self { store, audit }
    }

    /// Returns catalog roles with their effective grants.
    pub fn list_roles(&self, view: &RequestAuthzView) -> AppResult<Vec<RoleView>> {
        view.require(Permission::RolesRead)?;

        Ok(RoleCatalog::known_roles()
            .iter()
            .map(|role_name| RoleView {
                name: (*role_name).to_owned(),
                permissions: RoleCatalog::permissions_of(role_name).to_vec(),
            })
            .collect())
    }

    /// Grants a role to a user.
    pub async fn assign_role(
        &self,
        view: &RequestAuthzView,
        user_id: UserId,
        role_name: &str,
        meta: ClientMeta,
    ) -> AppResult<AssignmentOutcome> {
        view.require(Permission::RolesAssign)?;

        let outcome = self
            .store
            .assign(user_id, role_name, view.user_id())
            .await?;

        match outcome {
            AssignmentOutcome::AlreadyActive => {}
            AssignmentOutcome::Created | AssignmentOutcome::Reactivated => {
                let action = if outcome == AssignmentOutcome::Reactivated {
                    AuditAction::RoleReactivated
                } else {
                    AuditAction::RoleAssigned
                };
                self.audit.record_detached(AuditEvent {
                    actor_user_id: view.user_id(),
                    action,
                    entity_type: "user_role".to_owned(),
                    entity_id: format!("{user_id}:{role_name}"),
                    before: None,
                    after: Some(json!({
                        "user_id": user_id,
                        "role_name": role_name,
                        "active": true,
                    })),
                    ip: meta.ip,
                    user_agent: meta.user_agent,
                });
            }
        }

        Ok(outcome)
    }

    /// Deactivates a role assignment.
    pub async fn remove_role(
        &self,
        view: &RequestAuthzView,
        user_id: UserId,
        role_name: &str,
        meta: ClientMeta,
    ) -> AppResult<()> {
        view.require(Permission::RolesAssign)?;

        self.store.remove(user_id, role_name).await?;

        self.audit.record_detached(AuditEvent {
            actor_user_id: view.user_id(),
            action: AuditAction::RoleRemoved,
            entity_type: "user_role".to_owned(),
            entity_id: format!("{user_id}:{role_name}"),
            before: Some(json!({
                "user_id": user_id,
                "role_name": role_name,
                "active": true,
            })),
            after: Some(json!({
                "user_id": user_id,
                "role_name": role_name,
                "active": false,
            })),
            ip: meta.ip,
            user_agent: meta.user_agent,
        });

        Ok(())
    }

    /// Replaces a user's active role set.
    pub async fn sync_roles(
        &self,
        view: &RequestAuthzView,
        user_id: UserId,
        role_names: Vec<String>,
        meta: ClientMeta,
    ) -> AppResult<()> {
        view.require(Permission::RolesAssign)?;

        let previous_roles = self.store.roles_of(user_id).await?;
        self.store.sync(user_id, &role_names, view.user_id()).await?;

        self.audit.record_detached(AuditEvent {
            actor_user_id: view.user_id(),
            action: AuditAction::RolesSynced,
            entity_type: "user_roles".to_owned(),
            entity_id: user_id.to_string(),
            before: Some(json!({ "roles": previous_roles })),
            after: Some(json!({ "roles": role_names })),
            ip: meta.ip,
            user_agent: meta.user_agent,
        });

        Ok(())
    }

    /// Purges a role row after verifying no active assignment uses it.
    pub async fn delete_role(
        &self,
        view: &RequestAuthzView,
        role_name: &str,
        meta: ClientMeta,
    ) -> AppResult<()> {
        view.require(Permission::RolesAssign)?;

        self.store.delete_role(role_name).await?;

        self.audit.record_detached(AuditEvent {
            actor_user_id: view.user_id(),
            action: AuditAction::RoleDeleted,
            entity_type: "role".to_owned(),
            entity_id: role_name.to_owned(),
            before: Some(json!({ "role_name": role_name })),
            after: None,
            ip: meta.ip,
            user_agent: meta.user_agent,
        });

        Ok(())
    }

    /// Lists all assignments for administrative views.
    pub async fn list_assignments(
        &self,
        view: &RequestAuthzView,
    ) -> AppResult<Vec<RoleAssignmentRecord>> {
        view.require(Permission::RolesRead)?;
        self.store.list_assignments().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use taskboard_core::{AppError, AppResult, CurrentUser, UserId};
    use tokio::sync::Mutex;

    use crate::access_control::RequestAuthzView;
    use crate::audit::{AuditEvent, AuditRepository, AuditSink, ClientMeta};
    use crate::role_assignment::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};

    use super::RoleAdminService;

    #[derive(Default)]
    struct RecordingAuditRepository {
        entries: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for RecordingAuditRepository {
        async fn append_entry(&self, event: AuditEvent) -> AppResult<()> {
            self.entries.lock().await.push(event);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAssignmentStore {
        assignments: Mutex<Vec<(UserId, String)>>,
    }

    #[async_trait]
    impl RoleAssignmentStore for FakeAssignmentStore {
        async fn assign(
            &self,
            user_id: UserId,
            role_name: &str,
            _assigned_by: UserId,
        ) -> AppResult<AssignmentOutcome> {
            let mut assignments = self.assignments.lock().await;
            let pair = (user_id, role_name.to_owned());
            if assignments.contains(&pair) {
                return Ok(AssignmentOutcome::AlreadyActive);
            }
            assignments.push(pair);
            Ok(AssignmentOutcome::Created)
        }

        async fn remove(&self, user_id: UserId, role_name: &str) -> AppResult<()> {
            self.assignments
                .lock()
                .await
                .retain(|(stored_user, stored_role)| {
                    !(stored_user == &user_id && stored_role == role_name)
                });
            Ok(())
        }

        async fn sync(
            &self,
            user_id: UserId,
            role_names: &[String],
            _assigned_by: UserId,
        ) -> AppResult<()> {
            let mut assignments = self.assignments.lock().await;
            assignments.retain(|(stored_user, _)| stored_user != &user_id);
            assignments.extend(
                role_names
                    .iter()
                    .map(|role_name| (user_id, role_name.clone())),
            );
            Ok(())
        }

        async fn roles_of(&self, user_id: UserId) -> AppResult<Vec<String>> {
            let mut roles: Vec<String> = self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|(stored_user, _)| stored_user == &user_id)
                .map(|(_, role_name)| role_name.clone())
                .collect();
            roles.sort();
            Ok(roles)
        }

        async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool> {
            Ok(self
                .assignments
                .lock()
                .await
                .contains(&(user_id, role_name.to_owned())))
        }

        async fn delete_role(&self, _role_name: &str) -> AppResult<()> {
            Ok(())
        }

        async fn list_assignments(&self) -> AppResult<Vec<RoleAssignmentRecord>> {
            Ok(Vec::new())
        }
    }

    fn service() -> (RoleAdminService, Arc<RecordingAuditRepository>) {
        let audit_repository = Arc::new(RecordingAuditRepository::default());
        let service = RoleAdminService::new(
            Arc::new(FakeAssignmentStore::default()),
            AuditSink::new(audit_repository.clone()),
        );
        (service, audit_repository)
    }

    fn admin_view() -> RequestAuthzView {
        let user = CurrentUser::new(UserId::new(), "root", false);
        RequestAuthzView::from_roles(user, vec!["admin".to_owned()])
    }

    fn member_view() -> RequestAuthzView {
        let user = CurrentUser::new(UserId::new(), "mallory", false);
        RequestAuthzView::from_roles(user, vec!["member".to_owned()])
    }

    async fn wait_for_entries(repository: &RecordingAuditRepository, count: usize) {
        for _ in 0..50 {
            if repository.entries.lock().await.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn assign_requires_roles_assign_permission() {
        let (service, _) = service();

        let result = service
            .assign_role(
                &member_view(),
                UserId::new(),
                "member",
                ClientMeta::default(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn assign_emits_an_audit_event() {
        let (service, audit_repository) = service();

        let outcome = service
            .assign_role(
                &admin_view(),
                UserId::new(),
                "member",
                ClientMeta::default(),
            )
            .await;

        assert!(matches!(outcome, Ok(AssignmentOutcome::Created)));
        wait_for_entries(&audit_repository, 1).await;
        assert_eq!(audit_repository.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn repeated_assign_is_a_silent_no_op() {
        let (service, audit_repository) = service();
        let view = admin_view();
        let user_id = UserId::new();

        let first = service
            .assign_role(&view, user_id, "member", ClientMeta::default())
            .await;
        let second = service
            .assign_role(&view, user_id, "member", ClientMeta::default())
            .await;

        assert!(matches!(first, Ok(AssignmentOutcome::Created)));
        assert!(matches!(second, Ok(AssignmentOutcome::AlreadyActive)));
        wait_for_entries(&audit_repository, 1).await;
        // The no-op repeat does not produce a second audit entry.
        assert_eq!(audit_repository.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn sync_snapshots_previous_and_new_role_sets() {
        let (service, audit_repository) = service();
        let view = admin_view();
        let user_id = UserId::new();

        let assigned = service
            .assign_role(&view, user_id, "task_owner", ClientMeta::default())
            .await;
        assert!(assigned.is_ok());

        let synced = service
            .sync_roles(
                &view,
                user_id,
                vec!["project_owner".to_owned()],
                ClientMeta::default(),
            )
            .await;
        assert!(synced.is_ok());

        wait_for_entries(&audit_repository, 2).await;
        let entries = audit_repository.entries.lock().await;
        let sync_entry = entries
            .iter()
            .find(|entry| entry.entity_type == "user_roles");
        let Some(sync_entry) = sync_entry else {
            panic!("expected a sync audit entry");
        };
        assert_eq!(
            sync_entry.before,
            Some(serde_json::json!({ "roles": ["task_owner"] }))
        );
        assert_eq!(
            sync_entry.after,
            Some(serde_json::json!({ "roles": ["project_owner"] }))
        );
    }
}
