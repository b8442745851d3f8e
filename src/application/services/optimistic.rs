use super::queue_events::{QueueEvent, QueueEventKind, QueueListener};
use super::shipment_store::{ShipmentMap, ShipmentStore};
use super::sync_queue_service::SyncQueueService;
use crate::application::ports::permission::{Authorization, PermissionEngine};
use crate::application::ports::remote_executor::RemoteExecutor;
use crate::domain::entities::{Shipment, SyncAction};
use crate::domain::value_objects::{ActorRole, QueuedActionId, ShipmentId};
use crate::infrastructure::network::NetworkMonitor;
use crate::shared::error::AppError;
use std::sync::Arc;

/// Pre-mutation copies of every shipment a mutation touches. `None` means the
/// shipment did not exist, so restoring removes it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    entries: Vec<(ShipmentId, Option<Shipment>)>,
}

impl EntitySnapshot {
    pub fn capture(map: &ShipmentMap, ids: &[ShipmentId]) -> Self {
        let entries = ids
            .iter()
            .map(|id| (id.clone(), map.get(id).cloned()))
            .collect();
        Self { entries }
    }

    pub fn restore(self, map: &mut ShipmentMap) {
        for (id, previous) in self.entries {
            match previous {
                Some(shipment) => {
                    map.insert(id, shipment);
                }
                None => {
                    map.remove(&id);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The backend accepted the mutation; the store holds its canonical copy.
    Confirmed(Shipment),
    /// Applied locally and persisted for replay.
    Queued(QueuedActionId),
}

/// Runs every shipment mutation through authorize, snapshot, apply, dispatch
/// and then reconcile or roll back.
pub struct OptimisticCoordinator {
    store: Arc<ShipmentStore>,
    permissions: Arc<dyn PermissionEngine>,
    executor: Arc<dyn RemoteExecutor>,
    queue: Arc<SyncQueueService>,
    network: Arc<NetworkMonitor>,
}

impl OptimisticCoordinator {
    pub fn new(
        store: Arc<ShipmentStore>,
        permissions: Arc<dyn PermissionEngine>,
        executor: Arc<dyn RemoteExecutor>,
        queue: Arc<SyncQueueService>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            permissions,
            executor,
            queue,
            network,
        }
    }

    pub fn store(&self) -> &Arc<ShipmentStore> {
        &self.store
    }

    /// Listener that installs canonical results of replayed actions.
    pub fn replay_reconciler(&self) -> Arc<ReplayReconciler> {
        Arc::new(ReplayReconciler {
            store: Arc::clone(&self.store),
        })
    }

    pub async fn execute<F>(
        &self,
        role: ActorRole,
        action: SyncAction,
        apply: F,
    ) -> Result<MutationOutcome, AppError>
    where
        F: FnOnce(&mut ShipmentMap) -> Result<(), AppError> + Send,
    {
        let kind = action.kind();
        let target = action.shipment_id().clone();
        let touched = [target.clone()];

        let snapshot = {
            let mut entries = self.store.write();

            if let Authorization::Deny(reason) =
                self.permissions.authorize(kind, entries.get(&target), role)
            {
                tracing::warn!(
                    target: "sync::optimistic",
                    shipment_id = %target,
                    action_type = kind.as_str(),
                    ?role,
                    reason = %reason,
                    "mutation denied"
                );
                return Err(AppError::AuthorizationDenied(reason));
            }

            let snapshot = EntitySnapshot::capture(&entries, &touched);
            if let Err(err) = apply(&mut *entries) {
                snapshot.restore(&mut entries);
                tracing::debug!(
                    target: "sync::optimistic",
                    shipment_id = %target,
                    error = %err,
                    "mutation rejected locally"
                );
                return Err(err);
            }
            snapshot
        };

        if !self.network.is_online() {
            return match self.queue.enqueue(action).await {
                Ok(id) => {
                    tracing::info!(
                        target: "sync::optimistic",
                        shipment_id = %target,
                        action_id = %id,
                        "offline, mutation queued"
                    );
                    Ok(MutationOutcome::Queued(id))
                }
                Err(err) => {
                    self.rollback(snapshot, &target, &err);
                    Err(err)
                }
            };
        }

        match self.executor.execute(&action).await {
            Ok(canonical) => {
                self.store.reconcile(&target, canonical.clone());
                tracing::debug!(
                    target: "sync::optimistic",
                    shipment_id = %canonical.id,
                    version = canonical.version,
                    "mutation confirmed"
                );
                Ok(MutationOutcome::Confirmed(canonical))
            }
            Err(err) => {
                self.rollback(snapshot, &target, &err);
                Err(err)
            }
        }
    }

    fn rollback(&self, snapshot: EntitySnapshot, target: &ShipmentId, cause: &AppError) {
        let mut entries = self.store.write();
        snapshot.restore(&mut entries);
        tracing::warn!(
            target: "sync::optimistic",
            shipment_id = %target,
            error = %cause,
            "mutation rolled back"
        );
    }
}

/// Replaces optimistic entities with the backend's answer once a queued
/// action has been replayed.
pub struct ReplayReconciler {
    store: Arc<ShipmentStore>,
}

impl QueueListener for ReplayReconciler {
    fn on_event(&self, event: &QueueEvent) {
        if let QueueEventKind::ActionSynced { action, shipment } = &event.kind {
            self.store
                .reconcile(action.action.shipment_id(), shipment.clone());
            tracing::trace!(
                target: "sync::optimistic",
                action_id = %action.id,
                shipment_id = %shipment.id,
                "replayed action reconciled"
            );
        }
    }
}
