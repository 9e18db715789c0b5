//! Main Entrypoint for the Avatar API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the shared state (credential source, HTTP scope, room connector).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use avatar_api::{
    config::{Config, EnvCredentials},
    router::create_router,
    state::AppState,
};
use avatar_core::{
    http_scope::{DEFAULT_REQUEST_TIMEOUT, DefaultHttpScope},
    room::{DEFAULT_PING_INTERVAL, SignalConnector},
};
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Waits for `Ctrl+C`, then cancels every in-flight avatar session.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
    }
    info!("Received shutdown signal. Ending avatar sessions and shutting down...");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared State ---
    let shutdown = CancellationToken::new();
    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        credentials: Arc::new(EnvCredentials),
        http_scope: Arc::new(DefaultHttpScope::new(DEFAULT_REQUEST_TIMEOUT)),
        room_connector: Arc::new(SignalConnector::new(DEFAULT_PING_INTERVAL)),
        shutdown: shutdown.clone(),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        strategy = ?config.strategy,
        session_duration = ?config.session_duration,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    info!("Server has shut down.");
    Ok(())
}
