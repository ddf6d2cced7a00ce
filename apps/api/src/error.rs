use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use taskboard_core::AppError;
use tracing::error;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<String>,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = match self.0 {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, plain(message)),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, plain(message)),
            AppError::Conflict(message) => (StatusCode::CONFLICT, plain(message)),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, plain(message)),
            AppError::Forbidden {
                reason,
                user_roles,
                required_permission,
            } => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    success: false,
                    message: reason,
                    user_roles: Some(user_roles),
                    required_permission,
                },
            ),
            AppError::RateLimited(message) => (StatusCode::TOO_MANY_REQUESTS, plain(message)),
            AppError::Internal(detail) => {
                error!(%detail, "internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    plain("internal server error".to_owned()),
                )
            }
        };

        (status, Json(payload)).into_response()
    }
}

fn plain(message: String) -> ErrorResponse {
    ErrorResponse {
        success: false,
        message,
        user_roles: None,
        required_permission: None,
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
