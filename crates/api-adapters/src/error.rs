//! Maps `DomainError` onto HTTP statuses and `{"error": "..."}` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use domains::DomainError;

#[derive(Debug)]
pub struct ApiError(pub DomainError);

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(DomainError::validation(message))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::MissingToken
            | DomainError::InvalidToken
            | DomainError::InvalidCredentials
            | DomainError::AccountInactive => StatusCode::UNAUTHORIZED,
            DomainError::InsufficientRole | DomainError::AccessDenied => StatusCode::FORBIDDEN,
            DomainError::Validation(_)
            | DomainError::DependentRecordsExist(_)
            | DomainError::SelfDeletionForbidden => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self.0 {
            DomainError::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                "internal server error".to_string()
            }
            DomainError::Validation(message) | DomainError::Conflict(message) => message,
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
