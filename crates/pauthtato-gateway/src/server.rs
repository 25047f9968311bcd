//! Pauthtato HTTP Server

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use pauthtato_config::Config;
use tokio::net::TcpListener;

use crate::config_bridge;
use crate::error::{GatewayError, GatewayResult};
use crate::handlers::{self, AppState};

/// Create and configure the Axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Status
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .route(
            "/version",
            get(handlers::version).fallback(handlers::method_not_allowed),
        )
        // Registration
        .route(
            "/register",
            post(handlers::register).fallback(handlers::method_not_allowed),
        )
        .route(
            "/bundle",
            post(handlers::preview_bundle).fallback(handlers::method_not_allowed),
        )
        // Chain audit
        .route(
            "/chain",
            get(handlers::chain).fallback(handlers::method_not_allowed),
        )
        .route(
            "/chain/head",
            get(handlers::chain_head).fallback(handlers::method_not_allowed),
        )
        .route(
            "/chain/verify",
            get(handlers::chain_verify).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Fails if no API key is configured, the store cannot be opened, or the
/// listener cannot be bound.
pub async fn run(config: &Config) -> GatewayResult<()> {
    let state = config_bridge::build_state(config).await?;
    let app = create_router(state);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| GatewayError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %address, backend = ?config.ledger.backend, "Pauthtato listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(GatewayError::Serve)?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C signal"),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received SIGTERM signal");
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
