use taskboard_application::{
    AccessControlService, AuditLogService, AuthService, RateLimitService, RoleAdminService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub access_control_service: AccessControlService,
    pub role_admin_service: RoleAdminService,
    pub audit_log_service: AuditLogService,
    pub rate_limit_service: RateLimitService,
}
