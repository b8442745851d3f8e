use crate::application::ports::{ActionLog, PermissionEngine, RemoteExecutor};
use crate::application::services::{
    OptimisticCoordinator, QueueSubscription, ShipmentService, ShipmentStore, SyncQueueService,
};
use crate::infrastructure::database::Database;
use crate::infrastructure::network::{NetworkMonitor, NetworkTransition, TcpConnectivityProbe};
use crate::infrastructure::offline::SqliteActionLog;
use crate::shared::config::AppConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owns the sync pipeline and its background tasks.
pub struct SyncEngine {
    config: AppConfig,
    network: Arc<NetworkMonitor>,
    queue: Arc<SyncQueueService>,
    coordinator: Arc<OptimisticCoordinator>,
    shipments: Arc<ShipmentService>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reconciler: Mutex<Option<QueueSubscription>>,
}

impl SyncEngine {
    pub fn new(
        config: AppConfig,
        log: Arc<dyn ActionLog>,
        executor: Arc<dyn RemoteExecutor>,
        permissions: Arc<dyn PermissionEngine>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        let queue = SyncQueueService::new(
            log,
            Arc::clone(&executor),
            Arc::clone(&network),
            config.retry_policy(),
        );
        let coordinator = Arc::new(OptimisticCoordinator::new(
            Arc::new(ShipmentStore::new()),
            permissions,
            executor,
            Arc::clone(&queue),
            Arc::clone(&network),
        ));
        let shipments = Arc::new(ShipmentService::new(Arc::clone(&coordinator)));

        Self {
            config,
            network,
            queue,
            coordinator,
            shipments,
            tasks: Mutex::new(Vec::new()),
            reconciler: Mutex::new(None),
        }
    }

    /// Opens the configured database and builds the engine on top of it.
    ///
    /// With a probe address configured the engine starts offline and lets the
    /// probe decide. Without one the host is expected to feed
    /// `network().set_online` itself.
    pub async fn from_config(
        config: AppConfig,
        executor: Arc<dyn RemoteExecutor>,
        permissions: Arc<dyn PermissionEngine>,
    ) -> Result<Self> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let pool = Database::initialize(&config.database).await?;
        let log: Arc<dyn ActionLog> = Arc::new(SqliteActionLog::new(pool));
        let network = Arc::new(NetworkMonitor::new(
            config.network.probe_address.is_none(),
        ));

        Ok(Self::new(config, log, executor, permissions, network))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    pub fn queue(&self) -> &Arc<SyncQueueService> {
        &self.queue
    }

    pub fn coordinator(&self) -> &Arc<OptimisticCoordinator> {
        &self.coordinator
    }

    pub fn shipments(&self) -> &Arc<ShipmentService> {
        &self.shipments
    }

    /// Spawns the reconnect listener, the periodic flush, and the
    /// connectivity probe, then drains whatever survived the last run.
    pub async fn start(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            warn!(target: "sync::queue", "sync engine already started");
            return Ok(());
        }

        {
            let mut reconciler = self.reconciler.lock().await;
            *reconciler = Some(
                self.queue
                    .subscribe(self.coordinator.replay_reconciler()),
            );
        }

        if let Some(address) = &self.config.network.probe_address {
            let probe = TcpConnectivityProbe::new(
                address.clone(),
                Duration::from_secs(self.config.network.probe_timeout),
            )
            .map_err(|e| AppError::ConfigurationError(e.to_string()))?;
            tasks.push(self.network.spawn_probe(
                Arc::new(probe),
                Duration::from_secs(self.config.network.probe_interval),
            ));
        }

        tasks.push(self.spawn_reconnect_listener());

        if self.config.sync.auto_sync && self.config.sync.sync_interval > 0 {
            tasks.push(self.spawn_periodic_flush(Duration::from_secs(
                self.config.sync.sync_interval,
            )));
        }

        info!(
            target: "sync::queue",
            tasks = tasks.len(),
            online = self.network.is_online(),
            "sync engine started"
        );

        if self.network.is_online() {
            self.queue.trigger_flush();
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        // Aborted tasks resolve to a cancellation error.
        let _ = futures::future::join_all(handles).await;

        if let Some(subscription) = self.reconciler.lock().await.take() {
            subscription.unsubscribe();
        }
        info!(target: "sync::queue", "sync engine stopped");
    }

    fn spawn_reconnect_listener(&self) -> JoinHandle<()> {
        let mut transitions = self.network.transitions();
        let queue = Arc::clone(&self.queue);
        let network = Arc::clone(&self.network);

        tokio::spawn(async move {
            loop {
                match transitions.recv().await {
                    Ok(NetworkTransition::CameOnline) => {
                        info!(target: "sync::network", "back online, flushing queue");
                        queue.trigger_flush();
                    }
                    Ok(NetworkTransition::WentOffline) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "sync::network", skipped, "missed connectivity edges");
                        if network.is_online() {
                            queue.trigger_flush();
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_periodic_flush(&self, interval: Duration) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let network = Arc::clone(&self.network);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; startup already flushes.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !network.is_online() {
                    continue;
                }
                if let Err(e) = queue.flush().await {
                    warn!(target: "sync::queue", error = %e, "periodic flush failed");
                }
            }
        })
    }
}
