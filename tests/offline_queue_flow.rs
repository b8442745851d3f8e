mod common;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    ScriptedRemote, fast_policy, memory_log, sample_shipment, shipment_id, test_config, wait_until,
};
use shipment_sync_lib::SyncEngine;
use shipment_sync_lib::application::ports::{ActionLog, CorruptEntry, LogScan, RemoteExecutor};
use shipment_sync_lib::application::services::{
    FlushSkipReason, QueueEvent, QueueEventKind, SyncQueueService,
};
use shipment_sync_lib::domain::entities::{
    AddLedgerEntryPayload, MutationKind, QueuedAction, Shipment, SyncAction, UpdateStatusPayload,
};
use shipment_sync_lib::domain::value_objects::{QueuedActionId, ShipmentStatus};
use shipment_sync_lib::infrastructure::database::Database;
use shipment_sync_lib::infrastructure::network::NetworkMonitor;
use shipment_sync_lib::infrastructure::offline::SqliteActionLog;
use shipment_sync_lib::infrastructure::permission::RoleBasedPermissions;
use shipment_sync_lib::shared::config::DatabaseConfig;
use shipment_sync_lib::shared::error::AppError;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn deliver_s1() -> SyncAction {
    SyncAction::UpdateStatus(UpdateStatusPayload {
        id: shipment_id("S1"),
        status: ShipmentStatus::Delivered,
    })
}

fn ledger_s1(amount: i64) -> SyncAction {
    SyncAction::AddLedgerEntry(AddLedgerEntryPayload {
        id: shipment_id("S1"),
        entry_id: format!("entry-{amount}"),
        amount,
        description: None,
        recorded_at: Utc::now(),
    })
}

#[tokio::test]
async fn test_head_of_line_retry_keeps_strict_fifo() {
    let log = memory_log().await;
    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );

    queue.enqueue(deliver_s1()).await.unwrap();
    queue.enqueue(ledger_s1(500)).await.unwrap();
    assert_eq!(queue.stats().await.unwrap().pending, 2);

    remote.fail_next(AppError::TransientRemote("502 bad gateway".into()));
    remote.fail_next(AppError::TransientRemote("502 bad gateway".into()));
    network.set_online(true);
    let report = queue.flush().await.unwrap();

    let kinds: Vec<MutationKind> = remote.calls().iter().map(SyncAction::kind).collect();
    assert_eq!(
        kinds,
        vec![
            MutationKind::UpdateStatus,
            MutationKind::UpdateStatus,
            MutationKind::UpdateStatus,
            MutationKind::AddLedgerEntry,
        ]
    );
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed_attempts, 2);
    assert_eq!(report.lost, 0);
    assert_eq!(log.size().await.unwrap(), 0);

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert!(!stats.processing);
    assert!(stats.last_successful_sync.is_some());

    let server = remote.server_copy(&shipment_id("S1")).unwrap();
    assert_eq!(server.status, ShipmentStatus::Delivered);
    assert_eq!(server.ledger_balance(), 500);
}

#[tokio::test]
async fn test_concurrent_flushes_run_once() {
    let log = memory_log().await;
    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );
    for amount in [100, 200, 300] {
        queue.enqueue(ledger_s1(amount)).await.unwrap();
    }
    // One failure forces a backoff sleep, so the first flush is still running
    // when the others arrive.
    remote.fail_next(AppError::TransientRemote("timeout".into()));
    network.set_online(true);

    let reports =
        futures::future::join_all((0..4).map(|_| {
            let queue = Arc::clone(&queue);
            async move { queue.flush().await.unwrap() }
        }))
        .await;

    let ran: Vec<_> = reports.iter().filter(|r| r.skipped.is_none()).collect();
    assert_eq!(ran.len(), 1);
    assert_eq!(ran[0].synced, 3);
    assert!(
        reports
            .iter()
            .filter(|r| r.skipped.is_some())
            .all(|r| r.skipped == Some(FlushSkipReason::AlreadyRunning))
    );
    // Three successes plus one failed attempt: nothing executed twice.
    assert_eq!(remote.calls().len(), 4);
}

#[tokio::test]
async fn test_permanent_loss_is_surfaced_then_queue_moves_on() {
    let log = memory_log().await;
    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );

    let losses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&losses);
    let pending_at_loss = Arc::new(Mutex::new(None));
    let pending_sink = Arc::clone(&pending_at_loss);
    let subscription = queue.subscribe(Arc::new(move |event: &QueueEvent| {
        if let QueueEventKind::PermanentLoss(report) = &event.kind {
            sink.lock().unwrap().push(report.clone());
            *pending_sink.lock().unwrap() = Some(event.stats.pending);
        }
    }));

    let doomed = queue.enqueue(deliver_s1()).await.unwrap();
    queue.enqueue(ledger_s1(75)).await.unwrap();
    for _ in 0..3 {
        remote.fail_next(AppError::RemoteRejected("status transition refused".into()));
    }

    network.set_online(true);
    let report = queue.flush().await.unwrap();

    assert_eq!(report.lost, 1);
    assert_eq!(report.synced, 1);
    let losses = losses.lock().unwrap();
    assert_eq!(losses.len(), 1);
    assert_eq!(losses[0].action.id, doomed);
    assert_eq!(losses[0].action.retries, 3);
    // The loss is reported while the action is still in the log.
    assert_eq!(*pending_at_loss.lock().unwrap(), Some(2));
    assert_eq!(log.size().await.unwrap(), 0);
    assert_eq!(queue.metrics().permanent_losses, 1);

    subscription.unsubscribe();
    assert_eq!(queue.listener_count(), 0);
}

/// Appends one more action to the log during its first call, the way a
/// mutation made mid-flush would.
struct AppendingRemote {
    inner: ScriptedRemote,
    log: Arc<dyn ActionLog>,
    late: Mutex<Option<QueuedAction>>,
}

#[async_trait]
impl RemoteExecutor for AppendingRemote {
    async fn execute(&self, action: &SyncAction) -> Result<Shipment, AppError> {
        let late = self.late.lock().unwrap().take();
        if let Some(late) = late {
            self.log.append(&late).await?;
        }
        self.inner.execute(action).await
    }
}

#[tokio::test]
async fn test_actions_enqueued_during_flush_are_drained() {
    let log = memory_log().await;
    let inner = ScriptedRemote::new();
    inner.seed(sample_shipment("S1"));
    let remote = Arc::new(AppendingRemote {
        inner,
        log: Arc::clone(&log),
        late: Mutex::new(Some(QueuedAction::new(ledger_s1(20)))),
    });
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );
    queue.enqueue(ledger_s1(10)).await.unwrap();

    network.set_online(true);
    let report = queue.flush().await.unwrap();

    assert_eq!(report.synced, 2);
    assert_eq!(log.size().await.unwrap(), 0);
    assert_eq!(
        remote
            .inner
            .server_copy(&shipment_id("S1"))
            .unwrap()
            .ledger_balance(),
        30
    );
}

/// Appends one more action right after a pass reads an empty log, the way an
/// enqueue landing while the flush is still finishing would.
struct LateAppendLog {
    inner: Arc<dyn ActionLog>,
    late: Mutex<Option<QueuedAction>>,
}

#[async_trait]
impl ActionLog for LateAppendLog {
    async fn append(&self, action: &QueuedAction) -> Result<QueuedActionId, AppError> {
        self.inner.append(action).await
    }

    async fn scan(&self) -> Result<LogScan, AppError> {
        let scan = self.inner.scan().await?;
        if scan.is_empty() {
            let late = self.late.lock().unwrap().take();
            if let Some(late) = late {
                self.inner.append(&late).await?;
            }
        }
        Ok(scan)
    }

    async fn remove(&self, id: &QueuedActionId) -> Result<(), AppError> {
        self.inner.remove(id).await
    }

    async fn discard_corrupt(&self, entry: &CorruptEntry) -> Result<(), AppError> {
        self.inner.discard_corrupt(entry).await
    }

    async fn update(&self, action: &QueuedAction) -> Result<(), AppError> {
        self.inner.update(action).await
    }

    async fn size(&self) -> Result<u64, AppError> {
        self.inner.size().await
    }

    async fn clear(&self) -> Result<u64, AppError> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn test_action_enqueued_as_flush_ends_is_not_stranded() {
    let inner = memory_log().await;
    let log: Arc<dyn ActionLog> = Arc::new(LateAppendLog {
        inner: Arc::clone(&inner),
        late: Mutex::new(Some(QueuedAction::new(ledger_s1(20)))),
    });
    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log,
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );
    queue.enqueue(ledger_s1(10)).await.unwrap();

    network.set_online(true);
    let report = queue.flush().await.unwrap();
    assert_eq!(report.synced, 1);

    let drained = wait_until(|| {
        let inner = Arc::clone(&inner);
        async move { inner.size().await.map(|n| n == 0).unwrap_or(false) }
    })
    .await;

    assert!(drained);
    assert_eq!(remote.calls().len(), 2);
    assert_eq!(
        remote.server_copy(&shipment_id("S1")).unwrap().ledger_balance(),
        30
    );
}

#[tokio::test]
async fn test_corrupt_row_ahead_of_valid_action_does_not_block_queue() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite:{}?mode=rwc", dir.path().join("queue.db").display()),
        max_connections: 1,
    };
    let pool = Database::initialize(&config).await.unwrap();
    sqlx::query(
        r#"
        INSERT INTO sync_queue (action_id, action_type, payload, created_at, updated_at)
        VALUES ('x', 'UpdateStatus', '{"nope":true}', '2026-01-01T00:00:00Z', 0)
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    let log: Arc<dyn ActionLog> = Arc::new(SqliteActionLog::new(pool));

    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        remote.clone() as Arc<dyn RemoteExecutor>,
        network.clone(),
        fast_policy(),
    );
    let dropped = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&dropped);
    queue.subscribe(Arc::new(move |event: &QueueEvent| {
        if let QueueEventKind::CorruptEntryDropped(entry) = &event.kind {
            sink.lock().unwrap().push(entry.action_id.clone());
        }
    }));
    queue.enqueue(deliver_s1()).await.unwrap();

    network.set_online(true);
    for _ in 0..3 {
        queue.flush().await.unwrap();
    }

    assert_eq!(remote.calls().len(), 1);
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert!(stats.last_successful_sync.is_some());
    assert_eq!(*dropped.lock().unwrap(), vec!["x".to_string()]);
    assert_eq!(
        remote.server_copy(&shipment_id("S1")).unwrap().status,
        ShipmentStatus::Delivered
    );
}

#[tokio::test]
async fn test_queue_survives_reopen_of_file_database() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("nested").join("queue.db").display()
        ),
        max_connections: 2,
    };

    let mut first = QueuedAction::new(deliver_s1());
    first.record_failure("Remote call failed: timeout");
    let second = QueuedAction::new(ledger_s1(500));
    {
        let pool = Database::initialize(&config).await.unwrap();
        let log = SqliteActionLog::new(pool.clone());
        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();
        log.update(&first).await.unwrap();
        pool.close().await;
    }

    let pool = Database::initialize(&config).await.unwrap();
    let log = SqliteActionLog::new(pool);
    let restored = log.list_all().await.unwrap();

    assert_eq!(restored, vec![first, second]);
}

#[tokio::test]
async fn test_engine_flushes_when_connectivity_returns() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.seed(sample_shipment("S1"));
    let network = Arc::new(NetworkMonitor::new(false));
    let engine = SyncEngine::new(
        test_config(),
        memory_log().await,
        remote.clone() as Arc<dyn RemoteExecutor>,
        Arc::new(RoleBasedPermissions::new()),
        network.clone(),
    );
    engine.start().await.unwrap();

    engine.queue().enqueue(deliver_s1()).await.unwrap();
    engine.queue().enqueue(ledger_s1(250)).await.unwrap();
    assert!(remote.calls().is_empty());

    network.set_online(true);
    let queue = Arc::clone(engine.queue());
    let drained = wait_until(|| {
        let queue = Arc::clone(&queue);
        async move { queue.stats().await.map(|s| s.pending == 0 && !s.processing).unwrap_or(false) }
    })
    .await;

    assert!(drained);
    assert_eq!(remote.calls().len(), 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_clear_requires_no_flush_in_progress() {
    let log = memory_log().await;
    let network = Arc::new(NetworkMonitor::new(false));
    let queue = SyncQueueService::new(
        log.clone(),
        Arc::new(ScriptedRemote::new()) as Arc<dyn RemoteExecutor>,
        network,
        fast_policy(),
    );
    queue.enqueue(deliver_s1()).await.unwrap();

    assert_eq!(queue.clear().await.unwrap(), 1);
    assert_eq!(queue.flush().await.unwrap().skipped, Some(FlushSkipReason::Offline));
    assert_eq!(log.size().await.unwrap(), 0);
}
