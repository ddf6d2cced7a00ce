use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskboard_core::{AppError, AppResult, UserId};

/// A named throttle applied to a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Throttle category used as the key prefix.
    pub category: &'static str,
    /// Attempts allowed within one window.
    pub max_attempts: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl RateLimitRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(category: &'static str, max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            category,
            max_attempts,
            window_seconds,
        }
    }
}

/// Attempt count observed for a key within the active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Attempts recorded inside the window, including this one.
    pub attempt_count: u32,
}

/// Port for attempt bookkeeping.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the key and returns the in-window count.
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo>;

    /// Removes attempt state older than the cutoff, returning the number
    /// of keys dropped.
    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Application service throttling authenticated users per category.
///
/// Backed by a process-local map: counts are not shared across server
/// processes, so a multi-instance deployment needs a shared store before
/// the limits mean anything globally.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt for the user under the rule's category and
    /// rejects when the window budget is exhausted.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, user_id: UserId) -> AppResult<()> {
        let key = format!("{}:{user_id}", rule.category);
        let info = self
            .repository
            .record_attempt(key.as_str(), rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            return Err(AppError::RateLimited(
                "too many requests, please try again later".to_owned(),
            ));
        }

        Ok(())
    }

    /// Removes expired attempt state. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        self.repository.cleanup_expired(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use taskboard_core::{AppError, AppResult, UserId};
    use tokio::sync::Mutex;

    use super::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};

    #[derive(Default)]
    struct CountingRepository {
        counts: Mutex<std::collections::HashMap<String, u32>>,
    }

    #[async_trait]
    impl RateLimitRepository for CountingRepository {
        async fn record_attempt(
            &self,
            key: &str,
            _window_seconds: u64,
        ) -> AppResult<AttemptInfo> {
            let mut counts = self.counts.lock().await;
            let count = counts.entry(key.to_owned()).or_insert(0);
            *count += 1;
            Ok(AttemptInfo {
                attempt_count: *count,
            })
        }

        async fn cleanup_expired(&self, _cutoff: DateTime<Utc>) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn requests_inside_the_budget_pass() {
        let service = RateLimitService::new(Arc::new(CountingRepository::default()));
        let rule = RateLimitRule::new("security_admin", 2, 60);
        let user_id = UserId::new();

        assert!(service.check_rate_limit(&rule, user_id).await.is_ok());
        assert!(service.check_rate_limit(&rule, user_id).await.is_ok());
    }

    #[tokio::test]
    async fn exceeding_the_budget_is_rate_limited() {
        let service = RateLimitService::new(Arc::new(CountingRepository::default()));
        let rule = RateLimitRule::new("security_admin", 1, 60);
        let user_id = UserId::new();

        assert!(service.check_rate_limit(&rule, user_id).await.is_ok());
        let second = service.check_rate_limit(&rule, user_id).await;
        assert!(matches!(second, Err(AppError::RateLimited(_))));
    }

    #[tokio::test]
    async fn limits_are_keyed_per_user() {
        let service = RateLimitService::new(Arc::new(CountingRepository::default()));
        let rule = RateLimitRule::new("security_admin", 1, 60);

        assert!(service.check_rate_limit(&rule, UserId::new()).await.is_ok());
        assert!(service.check_rate_limit(&rule, UserId::new()).await.is_ok());
    }
}
