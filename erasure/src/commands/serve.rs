// erasure/src/commands/serve.rs
//
// USE CASE: Serve the action API.

use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use erasure_core::application::LiveServices;
use erasure_core::infrastructure::config::load_app_config;

use crate::logging::{self, Console};
use crate::server::{AppState, build_router};

pub async fn execute(config_path: PathBuf, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // A. Load the Config (Infra)
    let mut config = load_app_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    logging::init(&config.server.log_path, Console::Stdout)?;

    // B. Wire the adapters and the routes
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    let services = Arc::new(LiveServices::new(config.clone()));
    let router = build_router(AppState::new(config, services));

    // C. Serve
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🌐 Listening on {}", addr);
    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}
