use axum::extract::{Extension, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use taskboard_application::RateLimitRule;
use taskboard_core::{AppError, CurrentUser};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let raw_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let user = state.auth_service.authenticate(raw_token).await?;
    let view = state.access_control_service.authz_view(&user).await?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(view);
    Ok(next.run(request).await)
}

pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(rule): Extension<RateLimitRule>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    state
        .rate_limit_service
        .check_rate_limit(&rule, user.user_id())
        .await?;

    Ok(next.run(request).await)
}
