//! HTTP surface for the reply generator and the learning loop

pub mod http;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::learning::ImprovementEngine;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ImprovementEngine>,
}

impl AppState {
    pub fn new(engine: ImprovementEngine) -> Self {
        Self { engine: Arc::new(engine) }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(http::health_handler))
        .route("/active-prompt", get(http::active_prompt_handler))
        .route("/generate-reply", post(http::generate_reply_handler))
        .route("/improve-ai", post(http::improve_handler))
        .route("/improve-ai-manually", post(http::improve_manually_handler))
        .route("/save-prompt", post(http::save_prompt_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    if config.llm.api_key.is_none() {
        println!("⚠ GEMINI_API_KEY not set; generation endpoints will report it");
    }

    let state = AppState::new(ImprovementEngine::from_config(&config)?);
    let app = router(state);

    info!("Listening on http://{}", addr);
    println!("🚀 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
