use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use taskboard_application::{AttemptInfo, RateLimitRepository};
use taskboard_core::AppResult;

/// Process-local sliding-window attempt tracker.
///
/// Counts live in this process only; each API instance throttles
/// independently.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    attempts: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo> {
        let now = Utc::now();
        let window_start = now - Duration::seconds(window_seconds as i64);

        let mut attempts = self.attempts.lock().await;
        let timestamps = attempts.entry(key.to_owned()).or_default();
        timestamps.retain(|timestamp| *timestamp > window_start);
        timestamps.push(now);

        Ok(AttemptInfo {
            attempt_count: timestamps.len() as u32,
        })
    }

    async fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut attempts = self.attempts.lock().await;
        let before = attempts.len();
        attempts.retain(|_, timestamps| {
            timestamps
                .last()
                .is_some_and(|most_recent| *most_recent >= cutoff)
        });

        Ok((before - attempts.len()) as u64)
    }
}
