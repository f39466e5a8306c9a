//! API request and response types.

use crate::registry::UserStatus;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Registration request submitted from the Mini App.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Claimed Telegram id; must match the signed init data
    pub telegram_id: String,
    pub name: String,
    pub phone: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Admin login request.
#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: SecretString,
}

/// Issued admin token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Registration status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: UserStatus,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub registry_count: usize,
}
