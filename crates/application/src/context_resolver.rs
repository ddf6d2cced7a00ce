use std::sync::Arc;

use async_trait::async_trait;
use taskboard_core::{AppResult, UserId};
use taskboard_domain::{
    FileContext, ProjectContext, ResourceContext, ResourceKind, ResourceTarget, TaskContext,
    UserContext,
};
use uuid::Uuid;

/// Port for the per-resource-type instance queries behind context
/// resolution.
///
/// Every method answers `None` when the instance does not exist, which
/// the decision engine turns into a 404-class outcome.
#[async_trait]
pub trait ResourceContextRepository: Send + Sync {
    /// Resolves project facts for a caller.
    async fn project_context(
        &self,
        caller: UserId,
        project_id: Uuid,
    ) -> AppResult<Option<ProjectContext>>;

    /// Resolves task facts for a caller.
    async fn task_context(&self, caller: UserId, task_id: Uuid)
    -> AppResult<Option<TaskContext>>;

    /// Resolves file facts for a caller, walking through the owning task
    /// when the file is not attached to a project directly.
    async fn file_context(&self, caller: UserId, file_id: Uuid)
    -> AppResult<Option<FileContext>>;

    /// Resolves user-profile facts for a caller.
    async fn user_context(&self, caller: UserId, user_id: Uuid)
    -> AppResult<Option<UserContext>>;
}

/// Resolves per-request resource contexts, one strategy per resource
/// kind.
///
/// Contexts are computed fresh on every request and never cached: role
/// grants change rarely, but assignment and responsibility rows change
/// constantly.
#[derive(Clone)]
pub struct ResourceContextResolver {
    repository: Arc<dyn ResourceContextRepository>,
}

impl ResourceContextResolver {
    /// Creates a resolver from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn ResourceContextRepository>) -> Self {
        Self { repository }
    }

    /// Resolves the context for a targeted instance.
    ///
    /// `Ok(None)` means the instance does not exist.
    pub async fn resolve(
        &self,
        caller: UserId,
        target: ResourceTarget,
    ) -> AppResult<Option<ResourceContext>> {
        let context = match target.kind {
            ResourceKind::Project => self
                .repository
                .project_context(caller, target.id)
                .await?
                .map(ResourceContext::Project),
            ResourceKind::Task => self
                .repository
                .task_context(caller, target.id)
                .await?
                .map(ResourceContext::Task),
            ResourceKind::File => self
                .repository
                .file_context(caller, target.id)
                .await?
                .map(ResourceContext::File),
            ResourceKind::User => self
                .repository
                .user_context(caller, target.id)
                .await?
                .map(ResourceContext::User),
        };

        Ok(context)
    }
}
