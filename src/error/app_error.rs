use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    // Database errors
    Database(sqlx::Error),

    // Authentication & Authorization
    Unauthorized(String),
    Forbidden(String),

    // Resource errors
    NotFound(String),

    // Validation errors
    BadRequest(String),
    ValidationError(String),

    // Deadline exceeded before the work committed
    Timeout(String),

    // Internal errors
    Internal(String),
}

/// Uniform response envelope shared by success and failure paths.
#[derive(Serialize)]
struct ErrorEnvelope {
    status: bool,
    code: u16,
    message: String,
    data: Option<()>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to hand back to API clients.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Server error".to_string(),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::Timeout(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Timeout(msg) => tracing::warn!("Request deadline exceeded: {}", msg),
            _ => {}
        }

        let status = self.status_code();
        let body = ErrorEnvelope {
            status: false,
            code: status.as_u16(),
            message: self.public_message(),
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

// From implementations for automatic conversion
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Data not found".to_string()),
            _ => AppError::Database(err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parse error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

// Result type alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_row_not_found_to_not_found() {
        let error = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::NotFound(_)));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let error = AppError::ValidationError("Address is required".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.public_message(), "Address is required");
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = AppError::Internal("connection reset by peer".to_string());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "Server error");
    }

    #[test]
    fn timeout_is_transient() {
        let error = AppError::Timeout("Survey action exceeded deadline".to_string());
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
