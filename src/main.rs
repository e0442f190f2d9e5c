//! Arena relay server
//!
//! Entry point for the authoritative relay. It handles:
//! - WebSocket connections carrying movement, shot, hit and identity events
//! - The arena task that resolves combat and fans out results
//! - A health endpoint for the hosting platform

use std::net::SocketAddr;

use rand::Rng;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_shooter::app::AppState;
use arena_shooter::config::Config;
use arena_shooter::game::spawn::SpawnCatalog;
use arena_shooter::game::Arena;
use arena_shooter::http::build_router;
use arena_shooter::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting arena relay server");
    info!("Server address: {}", config.server_addr);

    let seed = config
        .spawn_seed
        .unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, tick_rate = config.tick_rate, "Arena configuration");

    // Spawn the arena task
    let (arena, handle) = Arena::new(SpawnCatalog::dust2(seed), config.tick_rate);
    let arena_task = tokio::spawn(arena.run());

    let state = AppState::new(config.clone(), handle);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Upgraded sockets may still hold arena handles
    arena_task.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
