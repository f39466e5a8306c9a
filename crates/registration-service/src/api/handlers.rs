//! HTTP request handlers.

use super::extract::VerifiedTelegramUser;
use super::types::{
    AdminLoginRequest, HealthResponse, MessageResponse, RegisterRequest, StatusResponse,
    TokenResponse,
};
use super::AppState;
use crate::auth::AdminClaims;
use crate::error::ServiceError;
use crate::registry::{UserRecord, UserStatus};
use axum::{
    extract::{Path, State},
    Json,
};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

/// Upper bound on records returned by the pending list.
const PENDING_LIST_LIMIT: usize = 100;

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry.read().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        registry_count: registry.count(),
    })
}

/// Submit a registration request from the Mini App.
pub async fn register(
    State(state): State<AppState>,
    VerifiedTelegramUser(telegram_user): VerifiedTelegramUser,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ServiceError> {
    // Signed but carrying no user object: nothing to bind the request to
    if telegram_user.is_empty() {
        warn!(claimed = %request.telegram_id, "Init data has no user");
        return Err(ServiceError::InvalidInitData);
    }

    // Init data is authentic; now make sure it is about the claimed user
    if !telegram_user.matches_id(&request.telegram_id) {
        warn!(
            claimed = %request.telegram_id,
            signed = ?telegram_user.id(),
            "Telegram ID mismatch"
        );
        return Err(ServiceError::TelegramIdMismatch);
    }

    let telegram_id = request.telegram_id.clone();
    let record = UserRecord::new_pending(request.telegram_id, request.name, request.phone);

    // Duplicate check and insert under one lock
    let mut registry = state.registry.write().await;
    if let Err(e) = registry.insert_one(record) {
        warn!(telegram_id = %telegram_id, "Duplicate registration attempt");
        return Err(e);
    }
    if let Err(e) = state.store.save(&registry).await {
        // Memory must not hold what the store does not
        registry.remove_one(&telegram_id);
        error!(telegram_id = %telegram_id, error = %e, "Failed to persist registration");
        return Err(e);
    }

    info!(telegram_id = %telegram_id, "Registration request stored");

    Ok(Json(MessageResponse::new(
        "Registration request sent successfully",
    )))
}

/// Poll the status of a registration.
pub async fn user_status(
    State(state): State<AppState>,
    Path(telegram_id): Path<String>,
) -> Result<Json<StatusResponse>, ServiceError> {
    let registry = state.registry.read().await;
    let record = registry
        .find_one(&telegram_id)
        .ok_or(ServiceError::NotFound(telegram_id.clone()))?;

    Ok(Json(StatusResponse {
        status: record.status,
    }))
}

/// Exchange admin credentials for a bearer token.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    if !state
        .admin
        .check_credentials(&request.username, request.password.expose_secret())
    {
        warn!(username = %request.username, "Failed admin login");
        return Err(ServiceError::InvalidCredentials);
    }

    let access_token = state
        .admin
        .issue_token(&request.username)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    info!(username = %request.username, "Admin logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// List pending registration requests, oldest first.
pub async fn pending_requests(
    admin: AdminClaims,
    State(state): State<AppState>,
) -> Json<Vec<UserRecord>> {
    let registry = state.registry.read().await;
    let pending = registry.find_by_status(UserStatus::Pending, PENDING_LIST_LIMIT);

    info!(admin = %admin.sub, count = pending.len(), "Listed pending requests");
    Json(pending)
}

/// Approve a registration.
pub async fn approve_request(
    admin: AdminClaims,
    State(state): State<AppState>,
    Path(telegram_id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    set_status(&state, &admin, &telegram_id, UserStatus::Approved).await?;
    Ok(Json(MessageResponse::new("User approved successfully")))
}

/// Reject a registration.
pub async fn reject_request(
    admin: AdminClaims,
    State(state): State<AppState>,
    Path(telegram_id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    set_status(&state, &admin, &telegram_id, UserStatus::Rejected).await?;
    Ok(Json(MessageResponse::new("User rejected successfully")))
}

/// Update a record's status; not found when nothing changed.
async fn set_status(
    state: &AppState,
    admin: &AdminClaims,
    telegram_id: &str,
    status: UserStatus,
) -> Result<(), ServiceError> {
    let mut registry = state.registry.write().await;
    let previous = registry
        .find_one(telegram_id)
        .map(|r| r.status)
        .ok_or_else(|| ServiceError::NotFound(telegram_id.to_string()))?;
    if !registry.update_status(telegram_id, status) {
        return Err(ServiceError::NotFound(telegram_id.to_string()));
    }
    if let Err(e) = state.store.save(&registry).await {
        registry.update_status(telegram_id, previous);
        error!(telegram_id = %telegram_id, error = %e, "Failed to persist status change");
        return Err(e);
    }

    info!(
        admin = %admin.sub,
        telegram_id = %telegram_id,
        status = ?status,
        "Registration status updated"
    );
    Ok(())
}
