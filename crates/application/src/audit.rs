use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use taskboard_core::{AppResult, UserId};
use taskboard_domain::{AuditAction, Permission};
use tracing::warn;

use crate::access_control::RequestAuthzView;

/// Immutable audit event payload emitted by application services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// User that performed the action.
    pub actor_user_id: UserId,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Entity type label.
    pub entity_type: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Snapshot of the entity before the mutation.
    pub before: Option<Value>,
    /// Snapshot of the entity after the mutation.
    pub after: Option<Value>,
    /// Client address captured from the request, when known.
    pub ip: Option<String>,
    /// Client user agent captured from the request, when known.
    pub user_agent: Option<String>,
}

/// Client request metadata captured for audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    /// Client address, when the transport knows it.
    pub ip: Option<String>,
    /// Client user agent header, when present.
    pub user_agent: Option<String>,
}

/// Port for persisting append-only audit entries.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit entry.
    async fn append_entry(&self, event: AuditEvent) -> AppResult<()>;
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub entry_id: String,
    /// Actor user identifier.
    pub actor_user_id: UserId,
    /// Stable action identifier.
    pub action: String,
    /// Entry entity type.
    pub entity_type: String,
    /// Entry entity identifier.
    pub entity_id: String,
    /// Snapshot before the mutation.
    pub before: Option<Value>,
    /// Snapshot after the mutation.
    pub after: Option<Value>,
    /// Client address, when captured.
    pub ip: Option<String>,
    /// Client user agent, when captured.
    pub user_agent: Option<String>,
    /// Entry timestamp in RFC3339.
    pub created_at: String,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional action filter.
    pub action: Option<String>,
    /// Optional actor filter.
    pub actor_user_id: Option<UserId>,
}

/// Port for reading and expiring stored audit entries.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists most recent audit entries.
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;

    /// Deletes entries created before the cutoff, returning the count
    /// removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Fire-and-forget recorder for authorization-relevant mutations.
///
/// The write happens on a detached task after the response has been
/// produced; a slow or failing audit store never adds request latency and
/// never rolls back the guarded mutation. Availability is chosen over
/// audit durability here, knowingly.
#[derive(Clone)]
pub struct AuditSink {
    repository: Arc<dyn AuditRepository>,
}

impl AuditSink {
    /// Creates a sink from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Records an event on a detached task. Failures are logged to the
    /// operational log and swallowed.
    pub fn record_detached(&self, event: AuditEvent) {
        let repository = Arc::clone(&self.repository);
        tokio::spawn(async move {
            let action = event.action;
            if let Err(error) = repository.append_entry(event).await {
                warn!(action = action.as_str(), %error, "failed to append audit entry");
            }
        });
    }

    /// Records an event inline. Used where the caller owns its own
    /// scheduling, such as tests and backfills.
    pub async fn record(&self, event: AuditEvent) -> AppResult<()> {
        self.repository.append_entry(event).await
    }
}

/// Application service for audit log reads and retention.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Returns recent audit entries for callers holding `audit:read`.
    pub async fn list_recent(
        &self,
        view: &RequestAuthzView,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        view.require(Permission::AuditRead)?;
        self.repository.list_recent_entries(query).await
    }

    /// Deletes entries older than the retention horizon. Invoked by the
    /// retention worker, not by request handlers.
    pub async fn purge_expired(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        self.repository.purge_older_than(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use taskboard_core::{AppError, AppResult, CurrentUser, UserId};
    use taskboard_domain::AuditAction;
    use tokio::sync::Mutex;

    use crate::access_control::RequestAuthzView;

    use super::{AuditEvent, AuditLogQuery, AuditLogService, AuditRepository, AuditSink};

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

    struct FailingAuditRepository;

    #[async_trait]
    impl AuditRepository for FailingAuditRepository {
        async fn append_entry(&self, _event: AuditEvent) -> AppResult<()> {
            Err(AppError::Internal("audit store unavailable".to_owned()))
        }
    }

    fn event(actor: UserId) -> AuditEvent {
        AuditEvent {
            actor_user_id: actor,
            action: AuditAction::RoleAssigned,
            entity_type: "user_role".to_owned(),
            entity_id: "alice:member".to_owned(),
            before: None,
            after: None,
            ip: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn record_detached_eventually_appends() {
        let repository = Arc::new(RecordingAuditRepository::default());
        let sink = AuditSink::new(repository.clone());

        sink.record_detached(event(UserId::new()));

        // The write lands on a separate scheduling turn.
        for _ in 0..50 {
            if !repository.entries.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(repository.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn record_detached_swallows_store_failures() {
        let sink = AuditSink::new(Arc::new(FailingAuditRepository));

        // Must not panic or surface the failure to the caller.
        sink.record_detached(event(UserId::new()));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    struct EmptyAuditLogRepository;

    #[async_trait]
    impl super::AuditLogRepository for EmptyAuditLogRepository {
        async fn list_recent_entries(
            &self,
            _query: AuditLogQuery,
        ) -> AppResult<Vec<super::AuditLogEntry>> {
            Ok(Vec::new())
        }

        async fn purge_older_than(
            &self,
            _cutoff: chrono::DateTime<chrono::Utc>,
        ) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn list_recent_requires_audit_read() {
        let service = AuditLogService::new(Arc::new(EmptyAuditLogRepository));
        let user = CurrentUser::new(UserId::new(), "alice", false);
        let view = RequestAuthzView::from_roles(user, vec!["member".to_owned()]);

        let result = service.list_recent(&view, AuditLogQuery::default()).await;

        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }
}
