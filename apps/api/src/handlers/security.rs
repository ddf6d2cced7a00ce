use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};

use taskboard_application::{ClientMeta, RequestAuthzView};
use taskboard_core::UserId;
use uuid::Uuid;

use crate::dto::{
    AssignRoleRequest, AssignRoleResponse, AuditLogEntryResponse, RemoveRoleAssignmentRequest,
    RoleAssignmentResponse, RoleResponse, SyncRolesRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&view)?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    headers: HeaderMap,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<AssignRoleResponse>)> {
    let outcome = state
        .role_admin_service
        .assign_role(
            &view,
            UserId::from_uuid(payload.user_id),
            payload.role_name.as_str(),
            client_meta(&headers),
        )
        .await?;

    Ok((StatusCode::OK, Json(AssignRoleResponse::from(outcome))))
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    headers: HeaderMap,
    Json(payload): Json<RemoveRoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .remove_role(
            &view,
            UserId::from_uuid(payload.user_id),
            payload.role_name.as_str(),
            client_meta(&headers),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_roles_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<SyncRolesRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .sync_roles(
            &view,
            UserId::from_uuid(user_id),
            payload.roles,
            client_meta(&headers),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    Path(role_name): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .delete_role(&view, role_name.as_str(), client_meta(&headers))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_admin_service
        .list_assignments(&view)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

#[derive(Debug, serde::Deserialize)]
pub struct AuditLogParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub action: Option<String>,
    pub actor_user_id: Option<Uuid>,
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    Query(params): Query<AuditLogParams>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let entries = state
        .audit_log_service
        .list_recent(
            &view,
            taskboard_application::AuditLogQuery {
                limit: params.limit.unwrap_or(50),
                offset: params.offset.unwrap_or(0),
                action: params.action,
                actor_user_id: params.actor_user_id.map(UserId::from_uuid),
            },
        )
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}

fn client_meta(headers: &HeaderMap) -> ClientMeta {
    ClientMeta {
        ip: headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_owned()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned),
    }
}
