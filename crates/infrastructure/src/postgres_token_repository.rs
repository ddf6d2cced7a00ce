use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use taskboard_application::TokenRepository;
use taskboard_core::{AppError, AppResult, CurrentUser, UserId};

/// PostgreSQL-backed lookup from API token digests to accounts.
#[derive(Clone)]
pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TokenUserRow {
    user_id: Uuid,
    username: String,
    is_superuser: bool,
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn find_user_by_token_digest(&self, digest: &str) -> AppResult<Option<CurrentUser>> {
        let row = sqlx::query_as::<_, TokenUserRow>(
            r#"
            SELECT
                users.id AS user_id,
                users.username,
                users.is_superuser
            FROM api_tokens
            INNER JOIN users ON users.id = api_tokens.user_id
            WHERE api_tokens.token_digest = $1
                AND (api_tokens.expires_at IS NULL OR api_tokens.expires_at > NOW())
            LIMIT 1
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve token: {error}")))?;

        Ok(row.map(|row| {
            CurrentUser::new(UserId::from_uuid(row.user_id), row.username, row.is_superuser)
        }))
    }
}
