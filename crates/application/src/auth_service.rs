use std::sync::Arc;

use async_trait::async_trait;
use taskboard_core::{AppError, AppResult, CurrentUser, token_digest};

/// Port for resolving API token digests to account data.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Finds the account behind a token digest, skipping expired tokens.
    async fn find_user_by_token_digest(&self, digest: &str) -> AppResult<Option<CurrentUser>>;
}

/// Application service for bearer-token authentication.
#[derive(Clone)]
pub struct AuthService {
    repository: Arc<dyn TokenRepository>,
}

impl AuthService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn TokenRepository>) -> Self {
        Self { repository }
    }

    /// Authenticates a raw bearer token into a current user.
    pub async fn authenticate(&self, raw_token: &str) -> AppResult<CurrentUser> {
        if raw_token.trim().is_empty() {
            return Err(AppError::Unauthorized(
                "authentication token is required".to_owned(),
            ));
        }

        self.repository
            .find_user_by_token_digest(token_digest(raw_token).as_str())
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use taskboard_core::{AppError, AppResult, CurrentUser, UserId, token_digest};

    use super::{AuthService, TokenRepository};

    struct FakeTokenRepository {
        users: HashMap<String, CurrentUser>,
    }

    #[async_trait]
    impl TokenRepository for FakeTokenRepository {
        async fn find_user_by_token_digest(
            &self,
            digest: &str,
        ) -> AppResult<Option<CurrentUser>> {
            Ok(self.users.get(digest).cloned())
        }
    }

    #[tokio::test]
    async fn authenticate_resolves_a_known_token() {
        let user = CurrentUser::new(UserId::new(), "alice", false);
        let service = AuthService::new(Arc::new(FakeTokenRepository {
            users: HashMap::from([(token_digest("tb_alice"), user.clone())]),
        }));

        let authenticated = service.authenticate("tb_alice").await;

        assert_eq!(authenticated.ok(), Some(user));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let service = AuthService::new(Arc::new(FakeTokenRepository {
            users: HashMap::new(),
        }));

        let result = service.authenticate("tb_unknown").await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn blank_token_is_rejected_before_lookup() {
        let service = AuthService::new(Arc::new(FakeTokenRepository {
            users: HashMap::new(),
        }));

        let result = service.authenticate("   ").await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
