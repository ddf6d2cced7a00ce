//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_rate_limit_repository;
mod in_memory_role_assignment_store;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_resource_context_repository;
mod postgres_role_assignment_store;
mod postgres_token_repository;

pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_role_assignment_store::InMemoryRoleAssignmentStore;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_resource_context_repository::PostgresResourceContextRepository;
pub use postgres_role_assignment_store::PostgresRoleAssignmentStore;
pub use postgres_token_repository::PostgresTokenRepository;
