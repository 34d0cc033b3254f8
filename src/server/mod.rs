//! HTTP surface: JSON endpoints plus read-only static folders

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::asset_catalog::UPLOADS_PREFIX;
use crate::app::AppContainer;
use crate::domain::model::ArtifactKind;

pub mod error;
pub mod handlers;

/// State shared by every route
#[derive(Clone)]
pub struct ServerState {
    pub container: Arc<dyn AppContainer>,
}

/// Build the application router
pub fn router(container: Arc<dyn AppContainer>) -> Router {
    let config = container.config();
    let storage = &config.storage;
    let body_limit = config.server.max_upload_mb.saturating_mul(1024 * 1024);

    let mut app = Router::new()
        .route("/upload", post(handlers::upload))
        .route("/thumbnails", post(handlers::thumbnails))
        .route("/split", post(handlers::split))
        .route("/concat", post(handlers::concat))
        .route("/health", get(handlers::health))
        .nest_service(UPLOADS_PREFIX, ServeDir::new(storage.uploads_path()));

    for kind in ArtifactKind::ALL {
        app = app.nest_service(kind.public_prefix(), ServeDir::new(storage.kind_path(kind)));
    }

    app.fallback_service(ServeDir::new(storage.public_path()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ServerState { container })
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(container: Arc<dyn AppContainer>) -> Result<()> {
    let config = container.config();
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.bind, config.server.port
            )
        })?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(container))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
