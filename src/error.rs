//! Error types for PixelPast server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error kinds returned in every error body.
///
/// Clients match on these instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    Forbidden = 3,
    StoreFailure = 4,
    NoSuchData = 5,
    Duplicate = 6,
    BadValue = 7,
    UpstreamFailure = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error means the backing store could not serve the request
    /// (as opposed to the request itself being wrong).
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::StoreUnavailable(_))
    }

    /// Stable kind for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) => ErrorCode::NotAuthorized,
            AppError::Authorization(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Database(_) | AppError::StoreUnavailable(_) => ErrorCode::StoreFailure,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Upstream(_) => ErrorCode::UpstreamFailure,
            AppError::Io(_) | AppError::Csv(_) | AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_) | AppError::Csv(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = match &self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::Upstream(msg) => msg.clone(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database unavailable".to_string()
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                "Storage unavailable".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Csv(e) => {
                tracing::error!("CSV error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (self.status(), body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Authentication("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_store_failure_kinds() {
        assert!(AppError::StoreUnavailable("down".into()).is_store_failure());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_store_failure());
        assert!(!AppError::NotFound("x".into()).is_store_failure());
        assert_eq!(AppError::StoreUnavailable("down".into()).code(), ErrorCode::StoreFailure);
    }
}
