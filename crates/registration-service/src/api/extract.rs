//! Request extractors for Telegram users and admins.

use super::AppState;
use crate::auth::AdminClaims;
use crate::error::ServiceError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use telegram_init_data::WebAppUser;
use tracing::{debug, warn};

/// Header carrying the Mini App's raw `initData` string.
pub const INIT_DATA_HEADER: &str = "telegram-init-data";

/// A Telegram user whose init data verified against the bot token.
///
/// Any verification failure is reported to the client as the same generic
/// error; the reason is only logged.
#[derive(Debug, Clone)]
pub struct VerifiedTelegramUser(pub WebAppUser);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedTelegramUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(INIT_DATA_HEADER)
            .ok_or(ServiceError::MissingInitData)?;
        let raw = header.to_str().map_err(|_| ServiceError::InvalidInitData)?;
        if raw.is_empty() {
            return Err(ServiceError::MissingInitData);
        }

        state
            .verifier
            .verify(raw)
            .map(VerifiedTelegramUser)
            .map_err(|e| {
                warn!(error = %e, "Rejected Telegram init data");
                ServiceError::InvalidInitData
            })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminClaims {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ServiceError::Unauthorized)?;

        state.admin.verify_token(token).map_err(|e| {
            debug!(error = %e, "Rejected admin token");
            ServiceError::Unauthorized
        })
    }
}

/// Token from an `Authorization: Bearer <token>` value (scheme is case-insensitive).
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
