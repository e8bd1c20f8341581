//! # lamina-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Lamina Partition API. Binds to a
//! configurable port (default 8000). The gateway ships without a
//! partitioning backend; embedding applications supply one via
//! `AppState::with_config`, and without one the partition operation
//! answers 503.

use lamina_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    lamina_api::logging::init(config.env);

    let port = config.port;
    let state = AppState::with_config(config, None);

    // Warm the description cache so a misconfigured route table aborts
    // startup instead of surfacing on the first description request.
    if let Err(e) = state.schema.get_or_build() {
        tracing::error!("API description synthesis failed: {e}");
        return Err(e.into());
    }

    let app = lamina_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Lamina Partition API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
