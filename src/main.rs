//! Lorencia - headless MU Online game client
//!
//! Connects to a MU game server, mirrors the world it is told about and
//! keeps a hero fighting, looting and dressing according to server packets.

mod common;
mod config;
mod game;
mod protocol;

use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use common::error::AppError;
use config::{env::get_config_path, load_and_validate};
use game::items::ItemCatalog;
use game::{GameClient, SessionEnd};

/// Exponential backoff between sessions.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn session_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Lorencia v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        AppError::from(e)
    })?;

    info!("Configuration loaded successfully");
    info!("  Server: {}:{}", config.server.host, config.server.port);
    info!("  Character: {} (class {})", config.character.id, config.character.class);

    let catalog = ItemCatalog::load(config.catalog_path()).map_err(|e| {
        error!("Failed to load item catalog: {}", e);
        AppError::from(e)
    })?;
    info!("Item catalog: {} definitions", catalog.len());

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let mut game_task = tokio::spawn(async move {
        let mut client = GameClient::new(config, catalog);
        let mut backoff = session_backoff();

        loop {
            match client.run(&mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Session saved and closed");
                    break;
                }
                Ok(SessionEnd::Disconnected) => {
                    info!("Game server disconnected");
                    backoff = session_backoff();
                }
                Err(e) => error!("Session error: {}", e),
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            info!("Reconnecting in {:.1} seconds...", delay.as_secs_f64());

            // Wait for delay OR shutdown signal
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received during backoff");
                        break;
                    }
                }
            }
        }
    });

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - saving character...");
            true
        }
        _ = &mut game_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (session already exited): {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), game_task).await {
            Ok(Ok(())) => info!("Session closed gracefully"),
            Ok(Err(e)) => warn!("Session task panicked: {}", e),
            Err(_) => warn!("Session shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
