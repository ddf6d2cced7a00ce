use std::collections::BTreeSet;
use std::sync::Arc;

use taskboard_core::{AppError, AppResult, CurrentUser, UserId};
use taskboard_domain::{ADMIN_ROLE, AccessDecision, Permission, ResourceTarget, RoleCatalog};
use tracing::{debug, warn};

use crate::context_resolver::ResourceContextResolver;
use crate::role_assignment::RoleAssignmentStore;

/// Immutable authorization view constructed once per request after role
/// resolution and threaded explicitly to handlers.
///
/// Replaces ad-hoc per-stage mutation of the request object: every stage
/// past authentication reads the same value.
#[derive(Debug, Clone)]
pub struct RequestAuthzView {
    user: CurrentUser,
    roles: Vec<String>,
    permissions: BTreeSet<Permission>,
}

impl RequestAuthzView {
    /// Builds a view by expanding the given active roles through the
    /// catalog.
    #[must_use]
    pub fn from_roles(user: CurrentUser, roles: Vec<String>) -> Self {
        let permissions = RoleCatalog::expand(roles.iter().map(String::as_str));
        Self {
            user,
            roles,
            permissions,
        }
    }

    /// Returns the authenticated user.
    #[must_use]
    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Returns the caller's user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.user_id()
    }

    /// Returns the caller's active role names.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns the expanded permission set.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Returns whether the caller bypasses context refinement.
    ///
    /// Admin membership is an ordinary role row; the special case exists
    /// for performance and clarity, not because admin grants differ
    /// structurally.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_superuser() || self.roles.iter().any(|role| role == ADMIN_ROLE)
    }

    /// Returns whether the expanded set contains the permission.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission)
    }

    /// Ensures the caller holds a permission that needs no instance
    /// refinement, with a denial error carrying decision detail.
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.has_permission(permission) {
            return Ok(());
        }

        Err(AppError::Forbidden {
            reason: format!("missing base permission '{}'", permission.as_str()),
            user_roles: self.roles.clone(),
            required_permission: Some(permission.as_str().to_owned()),
        })
    }
}

/// The access decision engine.
///
/// Combines the superuser short-circuit, the role-catalog permission
/// lookup, and per-resource context refinement into one verdict. The base
/// permission gate always runs before any existence check so probing
/// without list-level access learns nothing from 404s.
#[derive(Clone)]
pub struct AccessControlService {
    assignments: Arc<dyn RoleAssignmentStore>,
    contexts: ResourceContextResolver,
}

impl AccessControlService {
    /// Creates the engine from its collaborators.
    #[must_use]
    pub fn new(assignments: Arc<dyn RoleAssignmentStore>, contexts: ResourceContextResolver) -> Self {
        Self {
            assignments,
            contexts,
        }
    }

    /// Loads the caller's active roles and expands them into a request
    /// authorization view.
    pub async fn authz_view(&self, user: &CurrentUser) -> AppResult<RequestAuthzView> {
        let roles = self.assignments.roles_of(user.user_id()).await?;
        Ok(RequestAuthzView::from_roles(user.clone(), roles))
    }

    /// Decides whether the caller may perform the action, refining against
    /// the targeted instance when the permission requires it.
    pub async fn authorize(
        &self,
        view: &RequestAuthzView,
        permission: Permission,
        target: Option<ResourceTarget>,
    ) -> AppResult<AccessDecision> {
        if let Some(target) = target
            && permission.resource_kind() != Some(target.kind)
        {
            return Err(AppError::Validation(format!(
                "permission '{}' cannot be checked against a {} instance",
                permission.as_str(),
                target.kind.as_str()
            )));
        }

        if view.is_admin() {
            self.attach_admin_context(view, target).await;
            return Ok(AccessDecision::Allow);
        }

        if !view.permissions().contains(&permission) {
            return Ok(AccessDecision::deny(
                format!("missing base permission '{}'", permission.as_str()),
                view.roles().to_vec(),
                permission,
            ));
        }

        if !permission.requires_context() {
            return Ok(AccessDecision::Allow);
        }

        let Some(target) = target else {
            return Err(AppError::Validation(format!(
                "permission '{}' requires a resource id",
                permission.as_str()
            )));
        };

        let Some(context) = self.contexts.resolve(view.user_id(), target).await? else {
            return Ok(AccessDecision::NotFound);
        };

        if context.grants_instance_access() {
            return Ok(AccessDecision::Allow);
        }

        Ok(AccessDecision::deny(
            format!(
                "insufficient context for '{}' on {} '{}'",
                permission.as_str(),
                target.kind.as_str(),
                target.id
            ),
            view.roles().to_vec(),
            permission,
        ))
    }

    /// Convenience wrapper mapping verdicts onto the error taxonomy for
    /// services that guard their own operations.
    pub async fn require(
        &self,
        view: &RequestAuthzView,
        permission: Permission,
        target: Option<ResourceTarget>,
    ) -> AppResult<()> {
        match self.authorize(view, permission, target).await? {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(denial) => Err(AppError::Forbidden {
                reason: denial.reason,
                user_roles: denial.user_roles,
                required_permission: Some(denial.required_permission.as_str().to_owned()),
            }),
            AccessDecision::NotFound => Err(AppError::NotFound(
                "requested resource was not found".to_owned(),
            )),
        }
    }

    /// Resolves context for an admin request so it can travel with the
    /// request for diagnostics. Never blocks the allow verdict.
    async fn attach_admin_context(&self, view: &RequestAuthzView, target: Option<ResourceTarget>) {
        let Some(target) = target else {
            return;
        };

        match self.contexts.resolve(view.user_id(), target).await {
            Ok(Some(context)) => {
                debug!(user_id = %view.user_id(), ?context, "resolved context for admin request");
            }
            Ok(None) => {
                debug!(
                    user_id = %view.user_id(),
                    resource = target.kind.as_str(),
                    resource_id = %target.id,
                    "admin request targets a missing resource"
                );
            }
            Err(error) => {
                warn!(user_id = %view.user_id(), %error, "context resolution failed for admin request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use taskboard_core::{AppResult, CurrentUser, UserId};
    use taskboard_domain::{
        AccessDecision, FileContext, Permission, ProjectContext, ResourceKind, ResourceTarget,
        TaskContext, UserContext,
    };
    use uuid::Uuid;

    use crate::context_resolver::{ResourceContextRepository, ResourceContextResolver};
    use crate::role_assignment::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};

    use super::{AccessControlService, RequestAuthzView};

    struct FakeAssignmentStore {
        roles: HashMap<UserId, Vec<String>>,
    }

    #[async_trait]
    impl RoleAssignmentStore for FakeAssignmentStore {
        async fn assign(
            &self,
            _user_id: UserId,
            _role_name: &str,
            _assigned_by: UserId,
        ) -> AppResult<AssignmentOutcome> {
            Ok(AssignmentOutcome::Created)
        }

        async fn remove(&self, _user_id: UserId, _role_name: &str) -> AppResult<()> {
            Ok(())
        }

        async fn sync(
            &self,
            _user_id: UserId,
            _role_names: &[String],
            _assigned_by: UserId,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn roles_of(&self, user_id: UserId) -> AppResult<Vec<String>> {
            Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
        }

        async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool> {
            Ok(self
                .roles
                .get(&user_id)
                .is_some_and(|roles| roles.iter().any(|role| role == role_name)))
        }

        async fn delete_role(&self, _role_name: &str) -> AppResult<()> {
            Ok(())
        }

        async fn list_assignments(&self) -> AppResult<Vec<RoleAssignmentRecord>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeContextRepository {
        tasks: HashMap<Uuid, (Option<UserId>, Uuid)>,
        responsibles: HashMap<Uuid, Vec<UserId>>,
    }

    #[async_trait]
    impl ResourceContextRepository for FakeContextRepository {
        async fn project_context(
            &self,
            caller: UserId,
            project_id: Uuid,
        ) -> AppResult<Option<ProjectContext>> {
            Ok(self.responsibles.contains_key(&project_id).then(|| {
                ProjectContext {
                    project_id,
                    is_responsible: self.responsibles[&project_id].contains(&caller),
                }
            }))
        }

        async fn task_context(
            &self,
            caller: UserId,
            task_id: Uuid,
        ) -> AppResult<Option<TaskContext>> {
            Ok(self
                .tasks
                .get(&task_id)
                .map(|(assignee, project_id)| TaskContext {
                    task_id,
                    project_id: *project_id,
                    is_assignee: *assignee == Some(caller),
                    is_project_responsible: self
                        .responsibles
                        .get(project_id)
                        .is_some_and(|users| users.contains(&caller)),
                }))
        }

        async fn file_context(
            &self,
            _caller: UserId,
            _file_id: Uuid,
        ) -> AppResult<Option<FileContext>> {
            Ok(None)
        }

        async fn user_context(
            &self,
            caller: UserId,
            user_id: Uuid,
        ) -> AppResult<Option<UserContext>> {
            Ok(Some(UserContext {
                user_id,
                is_self: caller.as_uuid() == user_id,
            }))
        }
    }

    fn engine(
        roles: HashMap<UserId, Vec<String>>,
        contexts: FakeContextRepository,
    ) -> AccessControlService {
        AccessControlService::new(
            Arc::new(FakeAssignmentStore { roles }),
            ResourceContextResolver::new(Arc::new(contexts)),
        )
    }

    fn view_for(roles: Vec<&str>) -> (UserId, RequestAuthzView) {
        let user_id = UserId::new();
        let user = CurrentUser::new(user_id, "caller", false);
        let view =
            RequestAuthzView::from_roles(user, roles.into_iter().map(str::to_owned).collect());
        (user_id, view)
    }

    fn task_target(task_id: Uuid) -> Option<ResourceTarget> {
        Some(ResourceTarget {
            kind: ResourceKind::Task,
            id: task_id,
        })
    }

    #[tokio::test]
    async fn admin_is_allowed_even_for_missing_resources() {
        let (_, view) = view_for(vec!["admin"]);
        let engine = engine(HashMap::new(), FakeContextRepository::default());

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(Uuid::new_v4()))
            .await;

        assert!(matches!(decision, Ok(AccessDecision::Allow)));
    }

    #[tokio::test]
    async fn assignee_may_update_their_task() {
        let (caller, view) = view_for(vec!["task_owner"]);
        let task_id = Uuid::new_v4();
        let contexts = FakeContextRepository {
            tasks: HashMap::from([(task_id, (Some(caller), Uuid::new_v4()))]),
            responsibles: HashMap::new(),
        };
        let engine = engine(HashMap::new(), contexts);

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(task_id))
            .await;

        assert!(matches!(decision, Ok(AccessDecision::Allow)));
    }

    #[tokio::test]
    async fn unrelated_caller_is_denied_with_decision_detail() {
        let (_, view) = view_for(vec!["task_owner"]);
        let task_id = Uuid::new_v4();
        let contexts = FakeContextRepository {
            tasks: HashMap::from([(task_id, (Some(UserId::new()), Uuid::new_v4()))]),
            responsibles: HashMap::new(),
        };
        let engine = engine(HashMap::new(), contexts);

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(task_id))
            .await;

        match decision {
            Ok(AccessDecision::Deny(denial)) => {
                assert_eq!(denial.required_permission, Permission::TasksUpdate);
                assert_eq!(denial.user_roles, vec!["task_owner".to_owned()]);
            }
            other => panic!("expected a denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn project_responsible_may_update_an_unassigned_task() {
        let (caller, view) = view_for(vec!["project_owner"]);
        let task_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let contexts = FakeContextRepository {
            tasks: HashMap::from([(task_id, (Some(UserId::new()), project_id))]),
            responsibles: HashMap::from([(project_id, vec![caller])]),
        };
        let engine = engine(HashMap::new(), contexts);

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(task_id))
            .await;

        assert!(matches!(decision, Ok(AccessDecision::Allow)));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found_rather_than_denied() {
        let (_, view) = view_for(vec!["task_owner"]);
        let engine = engine(HashMap::new(), FakeContextRepository::default());

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(Uuid::new_v4()))
            .await;

        assert!(matches!(decision, Ok(AccessDecision::NotFound)));
    }

    #[tokio::test]
    async fn base_permission_gate_runs_before_existence_checks() {
        // member lacks tasks:update entirely, so probing an unknown id
        // yields a deny rather than a 404 existence oracle.
        let (_, view) = view_for(vec!["member"]);
        let engine = engine(HashMap::new(), FakeContextRepository::default());

        let decision = engine
            .authorize(&view, Permission::TasksUpdate, task_target(Uuid::new_v4()))
            .await;

        assert!(matches!(decision, Ok(AccessDecision::Deny(_))));
    }

    #[tokio::test]
    async fn create_permissions_skip_refinement() {
        let (_, view) = view_for(vec!["project_owner"]);
        let engine = engine(HashMap::new(), FakeContextRepository::default());

        let decision = engine
            .authorize(&view, Permission::ProjectsCreate, None)
            .await;

        assert!(matches!(decision, Ok(AccessDecision::Allow)));
    }

    #[tokio::test]
    async fn mismatched_target_kind_is_a_validation_error() {
        let (_, view) = view_for(vec!["project_owner"]);
        let engine = engine(HashMap::new(), FakeContextRepository::default());

        let result = engine
            .authorize(
                &view,
                Permission::ProjectsUpdate,
                task_target(Uuid::new_v4()),
            )
            .await;

        assert!(result.is_err());
    }
}
