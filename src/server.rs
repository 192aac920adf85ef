use crate::api;
use crate::backend::{ChatBackend, ChatRelay};
use crate::config::AppConfig;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub relay: ChatRelay,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config: Arc::new(config),
            relay: ChatRelay::new(backend),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let router = Router::new()
        .route("/", get(api::health))
        .route("/static/widget.css", get(api::serve_stylesheet))
        .route("/widget.js", get(api::serve_sdk))
        .route("/widget/mount", post(api::post_mount))
        .route("/chat", post(api::post_chat))
        .route("/iframe", get(api::iframe))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down pounce-widget server");
}
