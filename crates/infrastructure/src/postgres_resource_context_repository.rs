use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use taskboard_application::ResourceContextRepository;
use taskboard_core::{AppError, AppResult, UserId};
use taskboard_domain::{FileContext, ProjectContext, TaskContext, UserContext};

/// PostgreSQL-backed queries behind per-request context resolution.
///
/// Each query answers in one round-trip: the instance row plus the
/// caller's relationship facts, so resolution never multiplies database
/// latency on the request path.
#[derive(Clone)]
pub struct PostgresResourceContextRepository {
    pool: PgPool,
}

impl PostgresResourceContextRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    is_responsible: bool,
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    project_id: Uuid,
    assigned_user_id: Option<Uuid>,
    is_project_responsible: bool,
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    uploaded_by: Uuid,
    project_id: Option<Uuid>,
    is_project_responsible: bool,
}

#[async_trait]
impl ResourceContextRepository for PostgresResourceContextRepository {
    async fn project_context(
        &self,
        caller: UserId,
        project_id: Uuid,
    ) -> AppResult<Option<ProjectContext>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT
                projects.id,
                EXISTS (
                    SELECT 1
                    FROM project_responsibles
                    WHERE project_responsibles.project_id = projects.id
                        AND project_responsibles.user_id = $2
                        AND project_responsibles.active
                ) AS is_responsible
            FROM projects
            WHERE projects.id = $1
            "#,
        )
        .bind(project_id)
        .bind(caller.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve project context: {error}"))
        })?;

        Ok(row.map(|row| ProjectContext {
            project_id: row.id,
            is_responsible: row.is_responsible,
        }))
    }

    async fn task_context(
        &self,
        caller: UserId,
        task_id: Uuid,
    ) -> AppResult<Option<TaskContext>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT
                tasks.id,
                tasks.project_id,
                tasks.assigned_user_id,
                EXISTS (
                    SELECT 1
                    FROM project_responsibles
                    WHERE project_responsibles.project_id = tasks.project_id
                        AND project_responsibles.user_id = $2
                        AND project_responsibles.active
                ) AS is_project_responsible
            FROM tasks
            WHERE tasks.id = $1
            "#,
        )
        .bind(task_id)
        .bind(caller.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve task context: {error}"))
        })?;

        Ok(row.map(|row| TaskContext {
            task_id: row.id,
            project_id: row.project_id,
            is_assignee: row.assigned_user_id == Some(caller.as_uuid()),
            is_project_responsible: row.is_project_responsible,
        }))
    }

    async fn file_context(
        &self,
        caller: UserId,
        file_id: Uuid,
    ) -> AppResult<Option<FileContext>> {
        // The owning project is resolved through the file's task when the
        // file is attached to a task rather than a project directly.
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT
                files.id,
                files.uploaded_by,
                COALESCE(files.project_id, tasks.project_id) AS project_id,
                EXISTS (
                    SELECT 1
                    FROM project_responsibles
                    WHERE project_responsibles.project_id
                        = COALESCE(files.project_id, tasks.project_id)
                        AND project_responsibles.user_id = $2
                        AND project_responsibles.active
                ) AS is_project_responsible
            FROM files
            LEFT JOIN tasks ON tasks.id = files.task_id
            WHERE files.id = $1
            "#,
        )
        .bind(file_id)
        .bind(caller.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve file context: {error}"))
        })?;

        Ok(row.map(|row| FileContext {
            file_id: row.id,
            project_id: row.project_id,
            is_uploader: row.uploaded_by == caller.as_uuid(),
            is_project_responsible: row.is_project_responsible,
        }))
    }

    async fn user_context(
        &self,
        caller: UserId,
        user_id: Uuid,
    ) -> AppResult<Option<UserContext>> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve user context: {error}"))
        })?;

        Ok(exists.then_some(UserContext {
            user_id,
            is_self: caller.as_uuid() == user_id,
        }))
    }
}
