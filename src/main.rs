// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::application::monitor::DarknessMonitor;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::feed_client::FeedClient;
use crate::infrastructure::file_store::FileStore;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::socket_io::FeedEndpoint;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{chart_json, chart_stream, chart_svg, health_check, index};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_logging();

    // Load configuration
    let config = load_monitor_config()?;
    let endpoint = FeedEndpoint::parse(&config.feed.endpoint)?;

    // Create store (infrastructure layer)
    let store = Arc::new(FileStore::new(config.storage.resolved_path()));
    tracing::info!("Persisting chart to {}", store.path().display());

    // Mount the monitor (application layer)
    let client = FeedClient::new(endpoint, &config.feed.event, config.feed.reconnect_policy());
    let monitor = DarknessMonitor::mount(store, &config.storage.key, client, &config.feed.topic).await;

    let state = Arc::new(AppState {
        chart: monitor.chart().clone(),
        stopped: monitor.stopped(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/", get(index))
        .route("/healthz", get(health_check))
        .route("/chart.svg", get(chart_svg))
        .route("/chart.json", get(chart_json))
        .route("/chart/stream", get(chart_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting darkness-monitor on {}", addr);

    // Unmount before draining connections so live chart streams end
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            monitor.unmount().await;
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
