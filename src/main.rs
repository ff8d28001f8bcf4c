// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Context-ID Gateway API Server
//!
//! Brokers Casdoor logins and issues local session tokens.

use context_id_gateway::{
    config::Config,
    db::UserRepository,
    services::{state_store::SWEEP_INTERVAL, AuthGateway, CasdoorClient, SessionIssuer, StateStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        rsa_identity_key = config.uses_rsa_identity_key(),
        "Starting Context-ID Gateway"
    );

    // Local user storage
    let users = UserRepository::connect(&config).await?;

    // One-time OAuth states, swept in the background
    let states = Arc::new(StateStore::new());
    let sweeper = states.spawn_sweeper(SWEEP_INTERVAL);

    let casdoor = CasdoorClient::new(&config, Arc::clone(&states))?;
    let sessions = SessionIssuer::new(&config.session_signing_key, config.session_ttl);

    let gateway = AuthGateway::new(states, casdoor, users, sessions);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        gateway,
    });

    // Build router
    let app = context_id_gateway::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("context_id_gateway=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
