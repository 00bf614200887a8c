use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use auditry_core::AppError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The payload carries the bare detail; the category prefix of
        // the `Display` form is not part of the wire contract.
        let (status, detail) = match self.0 {
            AppError::Validation(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, detail),
            AppError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            AppError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Standard API handler result.
pub type ApiResult<T> = Result<T, ApiError>;
