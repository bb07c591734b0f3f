//! Error types for the check-in bot

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

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

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Outcomes the user caused and is told about; these are not logged as errors
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            AppError::Authorization(_)
                | AppError::NotFound(_)
                | AppError::Validation(_)
                | AppError::Conflict(_)
                | AppError::BusinessRule(_)
        )
    }

    /// Text shown to the chat user
    pub fn user_message(&self) -> String {
        match self {
            AppError::Authentication(_) => "Not authenticated.".to_string(),
            AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BusinessRule(msg) => msg.clone(),
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                "Something went wrong, please try again later.".to_string()
            }
            AppError::Telegram(_) => "Could not reach Telegram, please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Telegram(e.to_string())
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "authorization"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BusinessRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, "business_rule"),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database")
            }
            AppError::Telegram(_) => (StatusCode::BAD_GATEWAY, "telegram"),
            AppError::Io(_) | AppError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.user_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
