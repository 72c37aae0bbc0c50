mod handlers;
mod response;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;
use crate::scratch;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/comparison", post(handlers::compare_images))
        .route("/base", post(handlers::file_to_base64))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let store = scratch::create_store(config.scratch_dir.clone(), config.keep_scratch)
        .context("Failed to initialize scratch storage")?;
    let pipeline = Pipeline::new(config.pipeline.clone(), store);
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = router(state, config.max_body_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
        .context("Server terminated")?;

    tracing::info!("Server stopped");
    Ok(())
}
