//! Error types for the registration service.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Service error types.
///
/// Messages are returned to clients verbatim, so none of them carry the
/// reason init data was rejected.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Telegram Web App data is required")]
    MissingInitData,

    #[error("Invalid Telegram Web App data")]
    InvalidInitData,

    #[error("Telegram ID mismatch")]
    TelegramIdMismatch,

    #[error("User with this Telegram ID already exists")]
    AlreadyRegistered(String),

    #[error("User not found")]
    NotFound(String),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServiceError::MissingInitData => (StatusCode::BAD_REQUEST, "MISSING_INIT_DATA"),
            ServiceError::InvalidInitData => (StatusCode::BAD_REQUEST, "INVALID_INIT_DATA"),
            ServiceError::TelegramIdMismatch => (StatusCode::BAD_REQUEST, "TELEGRAM_ID_MISMATCH"),
            ServiceError::AlreadyRegistered(_) => (StatusCode::BAD_REQUEST, "ALREADY_REGISTERED"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServiceError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ServiceError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ServiceError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCRYPTION_ERROR"),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        match self {
            ServiceError::InvalidCredentials | ServiceError::Unauthorized => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Storage(format!("JSON serialization error: {}", e))
    }
}

impl From<aes_gcm::Error> for ServiceError {
    fn from(_: aes_gcm::Error) -> Self {
        ServiceError::Encryption("AES-GCM encryption/decryption failed".to_string())
    }
}
