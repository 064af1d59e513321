// src/monitor/mod.rs
use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::probe::Prober;
use crate::reconcile::Reconciler;
use crate::registry::Registry;
use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{error, info};

/// Drives the two periodic cycles: probe every endpoint on the check
/// cadence, re-fetch the instance list on the refresh cadence. The two
/// cycles are independent and may overlap; registry and per-endpoint
/// locking keeps the overlap safe.
pub struct Monitor {
    registry: Arc<Registry>,
    reconciler: Arc<Reconciler>,
    prober: Arc<Prober>,
    broadcaster: Arc<Broadcaster>,
    config: Config,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl Monitor {
    pub fn new(
        registry: Arc<Registry>,
        reconciler: Arc<Reconciler>,
        prober: Arc<Prober>,
        broadcaster: Arc<Broadcaster>,
        config: Config,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        Self {
            registry,
            reconciler,
            prober,
            broadcaster,
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Fetch the initial instance list. A failure here is not fatal: the
    /// refresh ticker retries on its own cadence.
    pub async fn initialize(&self) {
        if let Err(err) = self.reconciler.reconcile().await {
            error!("Initial instance fetch failed: {}", err);
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            "Starting monitor: check every {:?}, refresh every {:?}",
            self.config.check_interval, self.config.refresh_interval
        );

        // One immediate check cycle before entering the timer loop.
        self.check_all().await;

        let mut check_tick = interval_at(
            Instant::now() + self.config.check_interval,
            self.config.check_interval,
        );
        let mut refresh_tick = interval_at(
            Instant::now() + self.config.refresh_interval,
            self.config.refresh_interval,
        );
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = check_tick.tick() => {
                    self.check_all().await;
                }
                _ = refresh_tick.tick() => {
                    info!("Refreshing instance list...");
                    self.refresh().await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Monitor shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// One check cycle: probe a stable snapshot of the registry, wait for
    /// every probe, then broadcast unconditionally.
    async fn check_all(&self) {
        let endpoints = self.registry.snapshot().await;
        self.prober.run_cycle(endpoints).await;
        self.broadcaster.publish().await;
    }

    /// One reconciliation cycle: errors keep the previous endpoint set; a
    /// membership change triggers an extra broadcast.
    async fn refresh(&self) {
        match self.reconciler.reconcile().await {
            Ok(outcome) if outcome.membership_changed() => {
                self.broadcaster.publish().await;
            }
            Ok(_) => {}
            Err(err) => error!("Error refreshing instances: {}", err),
        }
    }
}
