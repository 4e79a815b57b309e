//! Swordplay headless client
//!
//! Joins the game server as one player and drives the synchronization core:
//! - session bootstrap over HTTP
//! - a WebSocket channel for snapshots and input messages
//! - local movement prediction at the frame rate
//! - keyboard and pointer input read as commands from stdin

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swordplay_client::app;
use swordplay_client::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env().context("invalid configuration")?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Swordplay client");
    info!(
        api = %config.api_base_url,
        host = %config.server_host,
        ws_port = config.ws_port,
        "Game server"
    );

    app::run(config, shutdown_signal())
        .await
        .context("game session failed")?;

    info!("Client shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
