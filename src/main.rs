mod config;
mod gemini;
mod models;
mod pdf;
mod pipeline;
mod render;
mod routes;
mod schema;
mod session;

#[cfg(test)]
mod mock;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::pipeline::Pipeline;
use crate::render::Renderer;
use crate::routes::AppState;
use crate::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    tracing::info!(
        key = %config.key_hint(),
        text_model = %config.text_model,
        image_model = %config.image_model,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Loaded configuration"
    );
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every generation will end in an error until it is");
    }

    let gemini = GeminiClient::from_config(&config).context("building Gemini client")?;
    let sessions = SessionStore::new();
    let sweeper = sessions.spawn_sweeper(config.session_ttl);
    let state = AppState {
        pipeline: Pipeline::new(sessions, Arc::new(gemini)),
        renderer: Arc::new(Renderer::new().context("loading page templates")?),
    };

    let app = routes::router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
