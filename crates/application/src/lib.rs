//! Application services and ports for the Taskboard access-control core.

#![forbid(unsafe_code)]

/// The access decision engine and per-request authorization view.
pub mod access_control;
/// Audit event ports, the fire-and-forget sink, and log reads.
pub mod audit;
/// Bearer-token authentication.
pub mod auth_service;
/// Per-resource-type context resolution.
pub mod context_resolver;
/// Role assignment administration.
pub mod role_admin_service;
/// The role assignment store port.
pub mod role_assignment;
/// Per-user request throttling.
pub mod rate_limit_service;

pub use access_control::{AccessControlService, RequestAuthzView};
pub use audit::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditLogService,
    AuditRepository, AuditSink, ClientMeta,
};
pub use auth_service::{AuthService, TokenRepository};
pub use context_resolver::{ResourceContextRepository, ResourceContextResolver};
pub use rate_limit_service::{
    AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService,
};
pub use role_admin_service::{RoleAdminService, RoleView};
pub use role_assignment::{AssignmentOutcome, RoleAssignmentRecord, RoleAssignmentStore};
