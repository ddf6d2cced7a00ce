use axum::Json;
use axum::extract::{Extension, State};

use taskboard_application::RequestAuthzView;
use taskboard_core::AppError;
use taskboard_domain::{AccessDecision, Permission, ResourceTarget};

use crate::dto::{AccessCheckRequest, AccessCheckResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Runs the full decision pipeline for a permission the caller names
/// explicitly. Denials and missing resources surface as 403 and 404, the
/// same way resource routes report them.
pub async fn access_check_handler(
    State(state): State<AppState>,
    Extension(view): Extension<RequestAuthzView>,
    Json(payload): Json<AccessCheckRequest>,
) -> ApiResult<Json<AccessCheckResponse>> {
    let permission = Permission::from_transport(payload.permission.as_str())?;

    let target = match payload.resource_id {
        Some(resource_id) => {
            let kind = permission.resource_kind().ok_or_else(|| {
                AppError::Validation(format!(
                    "permission '{}' does not target a resource instance",
                    permission.as_str()
                ))
            })?;
            Some(ResourceTarget {
                kind,
                id: resource_id,
            })
        }
        None => None,
    };

    match state
        .access_control_service
        .authorize(&view, permission, target)
        .await?
    {
        AccessDecision::Allow => Ok(Json(AccessCheckResponse { allowed: true })),
        AccessDecision::Deny(denial) => Err(AppError::Forbidden {
            reason: denial.reason,
            user_roles: denial.user_roles,
            required_permission: Some(denial.required_permission.as_str().to_owned()),
        }
        .into()),
        AccessDecision::NotFound => Err(AppError::NotFound(
            "requested resource was not found".to_owned(),
        )
        .into()),
    }
}
