use serde::{Deserialize, Serialize};
use uuid::Uuid;

use taskboard_application::{AssignmentOutcome, AuditLogEntry, RoleAssignmentRecord, RoleView};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub role_name: String,
}

/// Incoming payload for role removal.
#[derive(Debug, Deserialize)]
pub struct RemoveRoleAssignmentRequest {
    pub user_id: Uuid,
    pub role_name: String,
}

/// Incoming payload for replacing a user's role set.
#[derive(Debug, Deserialize)]
pub struct SyncRolesRequest {
    pub roles: Vec<String>,
}

/// API representation of a catalog role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub name: String,
    pub permissions: Vec<String>,
}

/// API representation of a role assignment row.
#[derive(Debug, Serialize)]
pub struct RoleAssignmentResponse {
    pub user_id: Uuid,
    pub role_name: String,
    pub assigned_by: Uuid,
    pub assigned_at: String,
    pub active: bool,
}

/// Outcome of an assignment request.
#[derive(Debug, Serialize)]
pub struct AssignRoleResponse {
    pub outcome: &'static str,
}

/// API representation of an audit log entry.
#[derive(Debug, Serialize)]
pub struct AuditLogEntryResponse {
    pub entry_id: String,
    pub actor_user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

/// Incoming payload for an explicit access check.
#[derive(Debug, Deserialize)]
pub struct AccessCheckRequest {
    pub permission: String,
    pub resource_id: Option<Uuid>,
}

/// Verdict payload for an explicit access check.
#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    pub allowed: bool,
}

impl From<RoleView> for RoleResponse {
    fn from(value: RoleView) -> Self {
        Self {
            name: value.name,
            permissions: value
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}

impl From<RoleAssignmentRecord> for RoleAssignmentResponse {
    fn from(value: RoleAssignmentRecord) -> Self {
        Self {
            user_id: value.user_id.as_uuid(),
            role_name: value.role_name,
            assigned_by: value.assigned_by.as_uuid(),
            assigned_at: value.assigned_at.to_rfc3339(),
            active: value.active,
        }
    }
}

impl From<AssignmentOutcome> for AssignRoleResponse {
    fn from(value: AssignmentOutcome) -> Self {
        let outcome = match value {
            AssignmentOutcome::Created => "created",
            AssignmentOutcome::Reactivated => "reactivated",
            AssignmentOutcome::AlreadyActive => "already_active",
        };
        Self { outcome }
    }
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            entry_id: value.entry_id,
            actor_user_id: value.actor_user_id.as_uuid(),
            action: value.action,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            before: value.before,
            after: value.after,
            ip: value.ip,
            user_agent: value.user_agent,
            created_at: value.created_at,
        }
    }
}
