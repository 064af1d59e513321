// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

mod broadcast;
mod config;
mod monitor;
mod probe;
mod reconcile;
mod registry;
mod server;
mod snapshot;

use crate::{
    broadcast::Broadcaster,
    config::Config,
    monitor::Monitor,
    probe::Prober,
    reconcile::Reconciler,
    registry::Registry,
    server::{AppState, RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("uptime_monitor=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    config.log();

    let registry = Arc::new(Registry::new());

    let fetch_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let reconciler = Arc::new(Reconciler::new(
        fetch_client,
        config.instances_url.clone(),
        registry.clone(),
    ));
    let prober = Arc::new(Prober::new(config.request_timeout, config.max_check_history));
    let broadcaster = Arc::new(Broadcaster::new(registry.clone()));

    let monitor = Arc::new(Monitor::new(
        registry.clone(),
        reconciler,
        prober,
        broadcaster.clone(),
        config.clone(),
    ));

    // Fetch the initial instance list, then run the check/refresh cycles
    // in the background.
    monitor.initialize().await;
    tokio::spawn(monitor.clone().start());

    let state = Arc::new(AppState {
        registry,
        broadcaster,
        config: config.clone(),
    });
    let handler = RequestHandler::new(state);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Starting uptime monitor on {}", addr);

    tokio::select! {
        result = ServerBuilder::new(addr).with_handler(handler).serve() => result?,
        _ = shutdown_signal() => {
            monitor.shutdown();
        }
    }

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
