use super::queue_events::{
    FlushReport, FlushSkipReason, ListenerRegistry, PermanentLossReport, QueueEvent,
    QueueEventKind, QueueListener, QueueSubscription,
};
use crate::application::ports::action_log::{ActionLog, CorruptEntry};
use crate::application::ports::remote_executor::RemoteExecutor;
use crate::domain::entities::{QueueStats, QueuedAction, SyncAction};
use crate::domain::value_objects::QueuedActionId;
use crate::infrastructure::network::NetworkMonitor;
use crate::shared::config::RetryPolicy;
use crate::shared::error::{AppError, Result};
use crate::shared::metrics::{ReplayMetrics, ReplayMetricsSnapshot};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Default, Clone)]
struct SyncState {
    last_sync_time: Option<DateTime<Utc>>,
    last_successful_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

enum ReplayOutcome {
    Synced,
    Lost,
    HaltedOffline,
}

/// Drains the action log against the backend, one action at a time.
///
/// At most one flush runs at any moment. Actions are replayed in log order
/// and an action that fails transiently is retried with exponential backoff
/// before the next one is attempted, so later mutations never overtake
/// earlier ones. Permanent rejections and undecodable entries are reported to
/// listeners and dropped.
pub struct SyncQueueService {
    me: Weak<SyncQueueService>,
    log: Arc<dyn ActionLog>,
    executor: Arc<dyn RemoteExecutor>,
    network: Arc<NetworkMonitor>,
    policy: RetryPolicy,
    gate: AsyncMutex<()>,
    processing: AtomicBool,
    state: Mutex<SyncState>,
    listeners: Arc<ListenerRegistry>,
    metrics: ReplayMetrics,
}

impl SyncQueueService {
    pub fn new(
        log: Arc<dyn ActionLog>,
        executor: Arc<dyn RemoteExecutor>,
        network: Arc<NetworkMonitor>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            log,
            executor,
            network,
            policy,
            gate: AsyncMutex::new(()),
            processing: AtomicBool::new(false),
            state: Mutex::new(SyncState::default()),
            listeners: Arc::new(ListenerRegistry::default()),
            metrics: ReplayMetrics::new(),
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Persists the action, then starts a background flush when the network is
    /// up and no flush is running.
    pub async fn enqueue(self: &Arc<Self>, action: SyncAction) -> Result<QueuedActionId> {
        let queued = QueuedAction::new(action);
        let kind = queued.kind();
        let id = self.log.append(&queued).await?;

        tracing::info!(
            target: "sync::queue",
            action_id = %id,
            action_type = kind.as_str(),
            "action queued for sync"
        );
        self.notify(QueueEventKind::Enqueued {
            action_id: id.clone(),
            kind,
        })
        .await;

        if self.network.is_online() && !self.is_processing() {
            self.trigger_flush();
        }

        Ok(id)
    }

    /// Fire-and-forget flush on the runtime.
    pub fn trigger_flush(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = queue.flush().await {
                tracing::error!(target: "sync::queue", error = %err, "background flush failed");
            }
        });
    }

    /// Runs one pass over the log. Actions appended while the pass was ending
    /// are picked up by a follow-up background flush.
    pub async fn flush(&self) -> Result<FlushReport> {
        if !self.network.is_online() {
            tracing::debug!(target: "sync::queue", "flush skipped: offline");
            return Ok(FlushReport::skipped(FlushSkipReason::Offline));
        }
        let Ok(guard) = self.gate.try_lock() else {
            tracing::debug!(target: "sync::queue", "flush skipped: already running");
            return Ok(FlushReport::skipped(FlushSkipReason::AlreadyRunning));
        };

        self.processing.store(true, Ordering::SeqCst);
        self.metrics.record_flush();
        let result = self.drain().await;
        self.processing.store(false, Ordering::SeqCst);

        let finished_at = Utc::now();
        if let Ok(mut state) = self.state.lock() {
            state.last_sync_time = Some(finished_at);
        }

        let (report, started_non_empty) = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.set_last_error(err.to_string());
                tracing::error!(target: "sync::queue", error = %err, "flush aborted");
                return Err(err);
            }
        };

        let remaining = self.log.size().await?;
        if started_non_empty && remaining == 0 {
            if let Ok(mut state) = self.state.lock() {
                state.last_successful_sync = Some(finished_at);
                state.last_error = None;
            }
        }

        tracing::info!(
            target: "sync::queue",
            synced = report.synced,
            lost = report.lost,
            failed_attempts = report.failed_attempts,
            remaining,
            "flush finished"
        );
        self.notify(QueueEventKind::FlushFinished(report.clone()))
            .await;
        drop(guard);

        if !report.halted_offline {
            self.reschedule_if_pending().await;
        }
        Ok(report)
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let pending = self.log.size().await?;
        Ok(self.stats_with_pending(pending))
    }

    pub fn subscribe(&self, listener: Arc<dyn QueueListener>) -> QueueSubscription {
        self.listeners.register(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> ReplayMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn pending_actions(&self) -> Result<Vec<QueuedAction>> {
        self.log.list_all().await
    }

    /// Discards every pending action. Waits for a running flush to finish.
    pub async fn clear(&self) -> Result<u64> {
        let _guard = self.gate.lock().await;
        let discarded = self.log.clear().await?;
        tracing::warn!(
            target: "sync::queue",
            discarded,
            "sync queue cleared, pending actions discarded"
        );
        self.notify(QueueEventKind::Cleared { discarded }).await;
        Ok(discarded)
    }

    /// An enqueue that lands after the last read of the log but before the
    /// gate is released sees a running flush and does not start one.
    async fn reschedule_if_pending(&self) {
        if !self.network.is_online() {
            return;
        }
        match self.log.size().await {
            Ok(0) => {}
            Ok(pending) => {
                if let Some(queue) = self.me.upgrade() {
                    tracing::debug!(
                        target: "sync::queue",
                        pending,
                        "actions arrived as flush ended, flushing again"
                    );
                    queue.trigger_flush();
                }
            }
            Err(err) => {
                tracing::warn!(target: "sync::queue", error = %err, "failed to re-check queue after flush");
            }
        }
    }

    /// Returns the report and whether the log had entries when the pass began.
    async fn drain(&self) -> Result<(FlushReport, bool)> {
        let mut report = FlushReport::default();
        let mut seen: HashSet<QueuedActionId> = HashSet::new();
        let mut started_non_empty = None;

        loop {
            let scan = self.log.scan().await?;
            let batch: Vec<QueuedAction> = scan
                .actions
                .into_iter()
                .filter(|action| !seen.contains(&action.id))
                .collect();
            let corrupt = scan.corrupt;

            if started_non_empty.is_none() {
                let pending = batch.len() + corrupt.len();
                started_non_empty = Some(pending > 0);
                self.notify(QueueEventKind::FlushStarted {
                    pending: pending as u64,
                })
                .await;
            }
            if batch.is_empty() && corrupt.is_empty() {
                break;
            }

            for entry in corrupt {
                self.drop_corrupt(entry).await?;
                report.lost += 1;
            }

            for action in batch {
                seen.insert(action.id.clone());
                match self.replay(action, &mut report).await? {
                    ReplayOutcome::Synced => report.synced += 1,
                    ReplayOutcome::Lost => report.lost += 1,
                    ReplayOutcome::HaltedOffline => {
                        report.halted_offline = true;
                        return Ok((report, started_non_empty.unwrap_or(false)));
                    }
                }
            }
        }

        Ok((report, started_non_empty.unwrap_or(false)))
    }

    async fn replay(
        &self,
        mut action: QueuedAction,
        report: &mut FlushReport,
    ) -> Result<ReplayOutcome> {
        loop {
            match self.executor.execute(&action.action).await {
                Ok(shipment) => {
                    self.log.remove(&action.id).await?;
                    self.metrics.record_synced();
                    tracing::debug!(
                        target: "sync::queue",
                        action_id = %action.id,
                        retries = action.retries,
                        "queued action synced"
                    );
                    self.notify(QueueEventKind::ActionSynced { action, shipment })
                        .await;
                    return Ok(ReplayOutcome::Synced);
                }
                Err(err) => {
                    let message = err.to_string();
                    let retries = action.record_failure(message.clone());
                    report.failed_attempts += 1;
                    self.metrics.record_failed_attempt();
                    self.set_last_error(message.clone());

                    if !err.is_transient() || action.is_exhausted(self.policy.max_retries) {
                        return self.give_up(action, message).await;
                    }

                    self.log.update(&action).await?;
                    let backoff = self.policy.backoff_for(retries);
                    tracing::warn!(
                        target: "sync::queue",
                        action_id = %action.id,
                        retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %message,
                        "queued action failed, backing off"
                    );
                    self.notify(QueueEventKind::ActionRetrying {
                        action_id: action.id.clone(),
                        retries,
                        error: message,
                        backoff,
                    })
                    .await;

                    tokio::time::sleep(backoff).await;

                    if !self.network.is_online() {
                        tracing::info!(
                            target: "sync::queue",
                            action_id = %action.id,
                            "network lost during backoff, stopping flush"
                        );
                        return Ok(ReplayOutcome::HaltedOffline);
                    }
                }
            }
        }
    }

    /// Surfaces the loss to listeners first, then removes the action.
    async fn give_up(&self, action: QueuedAction, last_error: String) -> Result<ReplayOutcome> {
        tracing::error!(
            target: "sync::queue",
            action_id = %action.id,
            action_type = action.kind().as_str(),
            retries = action.retries,
            error = %last_error,
            "queued action dropped without reaching the server"
        );
        self.metrics.record_permanent_loss();

        let id = action.id.clone();
        self.notify(QueueEventKind::PermanentLoss(PermanentLossReport {
            action,
            last_error,
        }))
        .await;
        self.log.remove(&id).await?;
        Ok(ReplayOutcome::Lost)
    }

    async fn drop_corrupt(&self, entry: CorruptEntry) -> Result<()> {
        tracing::error!(
            target: "sync::queue",
            action_id = %entry.action_id,
            action_type = %entry.action_type,
            error = %entry.error,
            "undecodable queued action dropped"
        );
        self.metrics.record_permanent_loss();
        self.set_last_error(entry.error.clone());
        self.notify(QueueEventKind::CorruptEntryDropped(entry.clone()))
            .await;
        self.log.discard_corrupt(&entry).await
    }

    async fn notify(&self, kind: QueueEventKind) {
        let stats = match self.stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(target: "sync::queue", error = %err, "failed to read queue size");
                self.stats_with_pending(0)
            }
        };
        self.listeners.dispatch(&QueueEvent { kind, stats });
    }

    fn stats_with_pending(&self, pending: u64) -> QueueStats {
        let state = self
            .state
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        QueueStats {
            pending,
            processing: self.is_processing(),
            last_sync_time: state.last_sync_time,
            last_successful_sync: state.last_successful_sync,
            last_error: state.last_error,
        }
    }

    fn set_last_error(&self, message: String) {
        if let Ok(mut state) = self.state.lock() {
            state.last_error = Some(message);
        }
    }
}
