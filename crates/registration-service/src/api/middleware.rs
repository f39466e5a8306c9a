//! Request throttling and access logging.

use crate::config::RateLimitConfig;
use crate::error::ServiceError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, error, warn};

const FALLBACK_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => unreachable!(),
};

/// Process-wide request budget shared by every route.
#[derive(Clone)]
pub struct RequestLimiter {
    inner: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestLimiter {
    /// A zero budget falls back to 60 per minute.
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(FALLBACK_PER_MINUTE));
        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::per_minute(config.global_per_minute)
    }

    /// Large enough that tests never hit it.
    pub fn unlimited() -> Self {
        Self::per_minute(u32::MAX)
    }

    /// Take one request from the budget.
    pub fn acquire(&self) -> Result<(), ServiceError> {
        self.inner
            .check()
            .map_err(|_| ServiceError::RateLimitExceeded)
    }
}

pub async fn throttle(
    State(limiter): State<RequestLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if let Err(e) = limiter.acquire() {
        warn!(path = %request.uri().path(), "Request budget exhausted");
        return Err(e);
    }
    Ok(next.run(request).await)
}

/// One line per request: method, path, status, latency.
///
/// The query string and headers are left out; they carry init data and
/// bearer tokens.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        error!(%method, %path, %status, latency_ms, "Request errored");
    } else if status.is_client_error() {
        warn!(%method, %path, %status, latency_ms, "Request rejected");
    } else {
        debug!(%method, %path, %status, latency_ms, "Request served");
    }

    response
}
