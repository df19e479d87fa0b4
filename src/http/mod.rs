//! HTTP API Module
//!
//! Exposes the pipeline over axum: one POST endpoint per stage, the
//! two-mode report endpoint, entity lookup, and a health probe. The graph
//! adapter and configuration ride in shared state injected at startup.

pub mod dto;
pub mod error;
pub mod handlers;

pub use handlers::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Creates the Axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let http_config = &state.config.http;

    // Build CORS layer
    let cors = if !http_config.cors_origins.is_empty() {
        // Explicit origins configured: restrict to those
        let origins: Vec<_> = http_config
            .cors_origins
            .iter()
            .filter_map(|s| {
                let parsed = s.parse();
                if parsed.is_err() {
                    warn!(origin = %s, "Invalid CORS origin ignored");
                }
                parsed.ok()
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if http_config.cors_allow_all {
        // Explicit dev mode opt-in: allow all origins
        Some(CorsLayer::permissive())
    } else {
        // Default: same-origin only (no CORS layer = Axum denies cross-origin)
        None
    };

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/summary", post(handlers::summary))
        .route("/lca", post(handlers::lca_endpoint))
        .route("/characterize", post(handlers::characterize_endpoint))
        .route("/kernel", post(handlers::kernel_endpoint))
        .route("/report/:mode", post(handlers::report))
        .route("/entities/:ids", get(handlers::entities))
        .layer(Extension(state));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    app
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Listens for SIGINT (ctrl-c) and SIGTERM to trigger graceful shutdown;
/// in-flight requests drain, then the process exits.
pub async fn start_http_server(
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", state.config.http.host, state.config.http.port).parse()?;
    let app = create_router(state);

    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => { info!("Received SIGINT, shutting down..."); }
            _ = sigterm.recv() => { info!("Received SIGTERM, shutting down..."); }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl-c");
        info!("Received SIGINT, shutting down...");
    }
}
