//! Domain-specific error types for study-buddy

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Main error type for the study-buddy service
#[derive(Error, Debug)]
pub enum StudyBuddyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Generation error: {message}")]
    Generation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("{message}")]
    Auth { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for StudyBuddyError {
    fn from(err: anyhow::Error) -> Self {
        StudyBuddyError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StudyBuddyError {
    fn from(err: serde_json::Error) -> Self {
        StudyBuddyError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StudyBuddyError {
    fn from(err: rusqlite::Error) -> Self {
        StudyBuddyError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for StudyBuddyError {
    fn from(err: reqwest::Error) -> Self {
        StudyBuddyError::Generation {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<chrono::ParseError> for StudyBuddyError {
    fn from(err: chrono::ParseError) -> Self {
        StudyBuddyError::Validation {
            message: format!("Date parsing error: {}", err),
        }
    }
}

/// Convert StudyBuddyError to an HTTP response with a JSON error body,
/// matching the `{"error": ...}` shape the endpoints promise.
impl IntoResponse for StudyBuddyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            StudyBuddyError::Validation { message } => (StatusCode::BAD_REQUEST, message),
            StudyBuddyError::Auth { message } => (StatusCode::UNAUTHORIZED, message),
            StudyBuddyError::Config { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Configuration error: {message}"),
            ),
            StudyBuddyError::Storage { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {message}"),
            ),
            StudyBuddyError::Generation { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Generation error: {message}"),
            ),
            StudyBuddyError::Serialization { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Serialization error: {message}"),
            ),
            StudyBuddyError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {message}"),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for study-buddy operations
pub type Result<T> = std::result::Result<T, StudyBuddyError>;
