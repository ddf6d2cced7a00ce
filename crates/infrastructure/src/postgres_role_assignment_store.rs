use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use taskboard_application::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};
use taskboard_core::{AppError, AppResult, UserId};

/// PostgreSQL-backed store for the user/role relation.
///
/// Sync atomicity comes from the database transaction, not from
/// in-process locking: concurrent readers observe either the pre-sync or
/// the post-sync role set.
#[derive(Clone)]
pub struct PostgresRoleAssignmentStore {
    pool: PgPool,
}

impl PostgresRoleAssignmentStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    active: bool,
}

#[derive(Debug, FromRow)]
struct AssignmentListRow {
    user_id: Uuid,
    role_name: String,
    assigned_by: Uuid,
    assigned_at: DateTime<Utc>,
    active: bool,
}

async fn require_user(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)
        "#,
    )
    .bind(user_id.as_uuid())
    .fetch_one(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to resolve user: {error}")))?;

    if !exists {
        return Err(AppError::NotFound(format!(
            "user '{user_id}' was not found"
        )));
    }

    Ok(())
}

async fn resolve_role_id(
    transaction: &mut Transaction<'_, Postgres>,
    role_name: &str,
) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM roles
        WHERE name = $1
        LIMIT 1
        "#,
    )
    .bind(role_name)
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
    .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' was not found")))
}

async fn upsert_assignment(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    role_id: Uuid,
    assigned_by: UserId,
) -> AppResult<AssignmentOutcome> {
    let existing = sqlx::query_as::<_, AssignmentRow>(
        r#"
        SELECT active
        FROM user_roles
        WHERE user_id = $1 AND role_id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id.as_uuid())
    .bind(role_id)
    .fetch_optional(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load assignment: {error}")))?;

    match existing {
        Some(row) if row.active => Ok(AssignmentOutcome::AlreadyActive),
        Some(_) => {
            sqlx::query(
                r#"
                UPDATE user_roles
                SET active = TRUE, assigned_by = $3, assigned_at = NOW()
                WHERE user_id = $1 AND role_id = $2
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id)
            .bind(assigned_by.as_uuid())
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to reactivate assignment: {error}"))
            })?;

            Ok(AssignmentOutcome::Reactivated)
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, assigned_by, active, assigned_at)
                VALUES ($1, $2, $3, TRUE, NOW())
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id)
            .bind(assigned_by.as_uuid())
            .execute(&mut **transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to insert assignment: {error}"))
            })?;

            Ok(AssignmentOutcome::Created)
        }
    }
}

#[async_trait]
impl RoleAssignmentStore for PostgresRoleAssignmentStore {
    async fn assign(
        &self,
        user_id: UserId,
        role_name: &str,
        assigned_by: UserId,
    ) -> AppResult<AssignmentOutcome> {
        let mut transaction = self.begin().await?;

        require_user(&mut transaction, user_id).await?;
        let role_id = resolve_role_id(&mut transaction, role_name).await?;
        let outcome = upsert_assignment(&mut transaction, user_id, role_id, assigned_by).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(outcome)
    }

    async fn remove(&self, user_id: UserId, role_name: &str) -> AppResult<()> {
        // A missing active assignment is a no-op, not an error.
        sqlx::query(
            r#"
            UPDATE user_roles
            SET active = FALSE
            FROM roles
            WHERE user_roles.role_id = roles.id
                AND user_roles.user_id = $1
                AND roles.name = $2
                AND user_roles.active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_name)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate assignment: {error}"))
        })?;

        Ok(())
    }

    async fn sync(
        &self,
        user_id: UserId,
        role_names: &[String],
        assigned_by: UserId,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;

        require_user(&mut transaction, user_id).await?;

        let mut role_ids = Vec::with_capacity(role_names.len());
        for role_name in role_names {
            role_ids.push(resolve_role_id(&mut transaction, role_name).await?);
        }

        sqlx::query(
            r#"
            UPDATE user_roles
            SET active = FALSE
            WHERE user_id = $1 AND active
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate previous roles: {error}"))
        })?;

        for role_id in role_ids {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, assigned_by, active, assigned_at)
                VALUES ($1, $2, $3, TRUE, NOW())
                ON CONFLICT (user_id, role_id) DO UPDATE
                SET active = TRUE, assigned_by = EXCLUDED.assigned_by, assigned_at = NOW()
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id)
            .bind(assigned_by.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to apply synced role: {error}"))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(())
    }

    async fn roles_of(&self, user_id: UserId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT roles.name
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1 AND user_roles.active
            ORDER BY roles.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))
    }

    async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_roles
                INNER JOIN roles ON roles.id = user_roles.role_id
                WHERE user_roles.user_id = $1
                    AND roles.name = $2
                    AND user_roles.active
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check role: {error}")))
    }

    async fn delete_role(&self, role_name: &str) -> AppResult<()> {
        let mut transaction = self.begin().await?;

        let role_id = resolve_role_id(&mut transaction, role_name).await?;

        let active_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_roles
            WHERE role_id = $1 AND active
            "#,
        )
        .bind(role_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count active assignments: {error}"))
        })?;

        if active_count > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_name}' still has {active_count} active assignment(s)"
            )));
        }

        // Inactive assignment rows go with the role; this is the explicit
        // administrative purge path.
        sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(())
    }

    async fn list_assignments(&self) -> AppResult<Vec<RoleAssignmentRecord>> {
        let rows = sqlx::query_as::<_, AssignmentListRow>(
            r#"
            SELECT
                user_roles.user_id,
                roles.name AS role_name,
                user_roles.assigned_by,
                user_roles.assigned_at,
                user_roles.active
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            ORDER BY user_roles.user_id, roles.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| RoleAssignmentRecord {
                user_id: UserId::from_uuid(row.user_id),
                role_name: row.role_name,
                assigned_by: UserId::from_uuid(row.assigned_by),
                assigned_at: row.assigned_at,
                active: row.active,
            })
            .collect())
    }
}
