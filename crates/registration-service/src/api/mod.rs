//! HTTP API for the registration service.

mod extract;
mod handlers;
mod middleware;
mod types;

pub use extract::{VerifiedTelegramUser, INIT_DATA_HEADER};
pub use handlers::*;
pub use middleware::{access_log, throttle, RequestLimiter};
pub use types::*;

use crate::auth::AdminAuth;
use crate::registry::{Registry, Store};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use telegram_init_data::InitDataVerifier;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registration records
    pub registry: Arc<RwLock<Registry>>,
    /// Persistent storage backend
    pub store: Arc<Store>,
    /// Telegram init data verifier
    pub verifier: Arc<InitDataVerifier>,
    /// Admin credentials and tokens
    pub admin: Arc<AdminAuth>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        registry: Registry,
        store: Store,
        verifier: InitDataVerifier,
        admin: AdminAuth,
    ) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            store: Arc::new(store),
            verifier: Arc::new(verifier),
            admin: Arc::new(admin),
        }
    }
}

/// Build the router. Every route, `/health` included, draws from `limiter`.
pub fn create_router(state: AppState, limiter: RequestLimiter) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Registrant endpoints
        .route("/register", post(handlers::register))
        .route("/user/status/:telegram_id", get(handlers::user_status))
        // Admin endpoints (bearer token except login)
        .route("/admin/login", post(handlers::admin_login))
        .route("/admin/requests", get(handlers::pending_requests))
        .route("/admin/approve/:telegram_id", post(handlers::approve_request))
        .route("/admin/reject/:telegram_id", post(handlers::reject_request))
        .layer(axum_middleware::from_fn_with_state(limiter, throttle))
        .layer(axum_middleware::from_fn(access_log))
        // The Mini App is served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
