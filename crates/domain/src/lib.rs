//! Domain types for the Taskboard access-control core.

#![forbid(unsafe_code)]

/// Stable audit action identifiers.
pub mod audit;
/// Resource context value objects and refinement predicates.
pub mod context;
/// Access decision verdict types.
pub mod decision;
/// The closed permission enumeration.
pub mod permission;
/// The static role catalog.
pub mod role;

pub use audit::AuditAction;
pub use context::{
    FileContext, ProjectContext, ResourceContext, ResourceKind, ResourceTarget, TaskContext,
    UserContext,
};
pub use decision::{AccessDecision, DecisionDenial};
pub use permission::Permission;
pub use role::{ADMIN_ROLE, MEMBER_ROLE, PROJECT_OWNER_ROLE, RoleCatalog, TASK_OWNER_ROLE};
