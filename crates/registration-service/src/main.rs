//! Registration service - Entry point.

use registration_service::{
    api::{create_router, AppState, RequestLimiter},
    auth::AdminAuth,
    config::Config,
    registry::{Registry, Store},
};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use telegram_init_data::InitDataVerifier;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting registration service");

    // Initialize storage
    let store = match (&config.store.encryption_key, config.store.persist) {
        (Some(key), true) => {
            info!(path = ?config.store.path, "Using encrypted persistent storage");
            Store::encrypted(config.store.path.clone(), key)
        }
        _ => {
            info!("Persistence disabled, using in-memory storage");
            Store::memory()
        }
    };

    // Load existing records. A file we cannot decrypt is fatal so it is never overwritten.
    let registry: Registry = match store.load().await {
        Ok(r) => {
            info!("Loaded registry with {} records", r.count());
            r
        }
        Err(e) => {
            error!("Failed to load registry: {}", e);
            std::process::exit(1);
        }
    };

    // Init data verifier keyed by the bot token
    let mut verifier = InitDataVerifier::new(config.telegram.bot_token.expose_secret());
    if let Some(max_age) = config.telegram.max_auth_age {
        info!(?max_age, "Rejecting init data older than the configured maximum age");
        verifier = verifier.with_max_age(max_age);
    }

    let admin = AdminAuth::from_config(&config.admin);

    // Create application state
    let state = AppState::new(registry, store, verifier, admin);

    let limiter = RequestLimiter::from_config(&config.rate_limit);
    let app = create_router(state, limiter);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
