use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use taskboard_application::{AuditLogEntry, AuditLogQuery, AuditLogRepository};
use taskboard_core::{AppError, AppResult, UserId};

/// PostgreSQL-backed repository for audit log read models and retention.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    entry_id: Uuid,
    actor_user_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: String,
    before: Option<Value>,
    after: Option<Value>,
    ip: Option<String>,
    user_agent: Option<String>,
    created_at: String,
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let capped_offset = query.offset.min(5_000) as i64;
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id AS entry_id,
                actor_user_id,
                action,
                entity_type,
                entity_id,
                before,
                after,
                ip,
                user_agent,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM audit_entries
            WHERE ($1::TEXT IS NULL OR action = $1)
                AND ($2::UUID IS NULL OR actor_user_id = $2)
            ORDER BY created_at DESC
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(query.action)
        .bind(query.actor_user_id.map(|user_id| user_id.as_uuid()))
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit entries: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| AuditLogEntry {
                entry_id: row.entry_id.to_string(),
                actor_user_id: UserId::from_uuid(row.actor_user_id),
                action: row.action,
                entity_type: row.entity_type,
                entity_id: row.entity_id,
                before: row.before,
                after: row.after,
                ip: row.ip,
                user_agent: row.user_agent,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let purged = sqlx::query(
            r#"
            DELETE FROM audit_entries
            WHERE created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to purge audit entries: {error}")))?
        .rows_affected();

        Ok(purged)
    }
}
