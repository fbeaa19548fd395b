use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationError(msg) => {
                tracing::warn!(validation_error = %msg, "Validation failed");
                let error_response = ErrorResponse::new(msg);
                (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
            }
            AppError::Unauthorized => {
                let error_response = ErrorResponse::new("Invalid or missing report key");
                (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
            }
        }
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(err: crate::validation::ValidationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
