use crate::domain::entities::Shipment;
use crate::domain::value_objects::ShipmentId;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ShipmentMap = BTreeMap<ShipmentId, Shipment>;

/// In-memory view of the shipments the client works with.
///
/// The guards are synchronous on purpose: a write guard cannot be held
/// across an `.await`, which keeps authorize, snapshot and apply atomic.
#[derive(Default)]
pub struct ShipmentStore {
    entries: RwLock<ShipmentMap>,
}

impl ShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shipments(shipments: impl IntoIterator<Item = Shipment>) -> Self {
        let store = Self::new();
        store.hydrate(shipments);
        store
    }

    /// Replaces the whole collection, e.g. after a full fetch from the backend.
    pub fn hydrate(&self, shipments: impl IntoIterator<Item = Shipment>) {
        let mut entries = self.write();
        entries.clear();
        for shipment in shipments {
            entries.insert(shipment.id.clone(), shipment);
        }
    }

    pub fn get(&self, id: &ShipmentId) -> Option<Shipment> {
        self.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Shipment> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Installs the server's canonical copy. When the server assigned a
    /// different id, the optimistic entry under `local_id` is dropped.
    pub fn reconcile(&self, local_id: &ShipmentId, canonical: Shipment) {
        let mut entries = self.write();
        if &canonical.id != local_id {
            entries.remove(local_id);
        }
        entries.insert(canonical.id.clone(), canonical);
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ShipmentMap> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ShipmentMap> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
