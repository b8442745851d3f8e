#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use shipment_sync_lib::application::ports::{ActionLog, RemoteExecutor};
use shipment_sync_lib::domain::entities::{
    LedgerEntry, NewShipment, Obligation, Shipment, SyncAction,
};
use shipment_sync_lib::domain::value_objects::ShipmentId;
use shipment_sync_lib::infrastructure::offline::SqliteActionLog;
use shipment_sync_lib::shared::config::{AppConfig, RetryPolicy};
use shipment_sync_lib::shared::error::AppError;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend double that applies actions to its own copy of the data, bumping
/// the version on every accepted write. Failures can be scripted up front.
#[derive(Default)]
pub struct ScriptedRemote {
    server: Mutex<BTreeMap<ShipmentId, Shipment>>,
    failures: Mutex<VecDeque<AppError>>,
    calls: Mutex<Vec<SyncAction>>,
    assign_server_ids: bool,
    next_id: Mutex<u32>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created shipments get a server id instead of keeping the local one.
    pub fn assigning_ids() -> Self {
        Self {
            assign_server_ids: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, shipment: Shipment) {
        self.server
            .lock()
            .unwrap()
            .insert(shipment.id.clone(), shipment);
    }

    pub fn fail_next(&self, error: AppError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<SyncAction> {
        self.calls.lock().unwrap().clone()
    }

    pub fn server_copy(&self, id: &ShipmentId) -> Option<Shipment> {
        self.server.lock().unwrap().get(id).cloned()
    }

    fn apply(&self, action: &SyncAction) -> Result<Shipment, AppError> {
        let mut server = self.server.lock().unwrap();
        let now = Utc::now();

        if let SyncAction::CreateShipment(new) = action {
            let mut created = Shipment::from_new(new, now)?;
            if self.assign_server_ids {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                created.id = ShipmentId::new(format!("S-{}", 100 + *next)).unwrap();
            }
            created.version = 1;
            server.insert(created.id.clone(), created.clone());
            return Ok(created);
        }

        let shipment = server
            .get_mut(action.shipment_id())
            .ok_or_else(|| AppError::RemoteRejected("unknown shipment".into()))?;
        match action {
            SyncAction::CreateShipment(_) => unreachable!(),
            SyncAction::UpdateStatus(payload) => shipment.set_status(payload.status.clone(), now)?,
            SyncAction::AddDocument(payload) => shipment.add_document(payload.document.clone())?,
            SyncAction::AddLedgerEntry(payload) => shipment.add_ledger_entry(LedgerEntry {
                id: payload.entry_id.clone(),
                amount: payload.amount,
                description: payload.description.clone(),
                recorded_at: payload.recorded_at,
            })?,
            SyncAction::PayObligation(payload) => {
                shipment.pay_obligation(&payload.obligation_id, payload.amount, payload.paid_at)?
            }
            SyncAction::UpdateShipmentFields(payload) => {
                shipment.apply_fields(&payload.fields, now)?
            }
        }
        shipment.version += 1;
        Ok(shipment.clone())
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedRemote {
    async fn execute(&self, action: &SyncAction) -> Result<Shipment, AppError> {
        self.calls.lock().unwrap().push(action.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.apply(action)
    }
}

pub async fn memory_log() -> Arc<dyn ActionLog> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Arc::new(SqliteActionLog::new(pool))
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

/// Config with background timers off and millisecond backoff.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.queue.base_delay_ms = 1;
    config.queue.max_delay_ms = 5;
    config.sync.auto_sync = false;
    config.network.probe_address = None;
    config
}

pub fn sample_shipment(id: &str) -> Shipment {
    let mut shipment = Shipment::from_new(
        &NewShipment {
            id: ShipmentId::new(id.into()).unwrap(),
            reference: format!("BL-{id}"),
            client_name: "Acme Imports".into(),
            declared_value: 25_000,
            origin_country: "CN".into(),
        },
        Utc::now(),
    )
    .unwrap();
    shipment.obligations.push(Obligation {
        id: "duty".into(),
        label: "Import duty".into(),
        amount_due: 1_200,
        amount_paid: 0,
        paid_at: None,
    });
    shipment.version = 1;
    shipment
}

pub fn shipment_id(id: &str) -> ShipmentId {
    ShipmentId::new(id.into()).unwrap()
}

/// Polls until `check` holds or the timeout elapses.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
