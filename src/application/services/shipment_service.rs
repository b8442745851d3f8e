use super::optimistic::{MutationOutcome, OptimisticCoordinator};
use super::shipment_store::ShipmentMap;
use crate::domain::entities::{
    AddDocumentPayload, AddLedgerEntryPayload, LedgerEntry, NewShipment, PayObligationPayload,
    Shipment, ShipmentDocument, ShipmentFieldsPatch, SyncAction, UpdateShipmentFieldsPayload,
    UpdateStatusPayload,
};
use crate::domain::value_objects::{ActorRole, ShipmentId, ShipmentStatus};
use crate::shared::error::{AppError, Result};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShipmentRequest {
    pub reference: String,
    pub client_name: String,
    pub declared_value: i64,
    pub origin_country: String,
}

/// Shipment mutations exposed to the UI. Each one goes through the
/// optimistic coordinator and returns once it is confirmed or queued.
pub struct ShipmentService {
    coordinator: Arc<OptimisticCoordinator>,
}

impl ShipmentService {
    pub fn new(coordinator: Arc<OptimisticCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn get(&self, id: &ShipmentId) -> Option<Shipment> {
        self.coordinator.store().get(id)
    }

    pub fn list(&self) -> Vec<Shipment> {
        self.coordinator.store().list()
    }

    /// Creates the shipment under a fresh local id. The backend may answer
    /// with its own id, in which case the local entry is replaced.
    pub async fn create_shipment(
        &self,
        role: ActorRole,
        request: CreateShipmentRequest,
    ) -> Result<MutationOutcome> {
        let new = NewShipment {
            id: ShipmentId::generate_local(),
            reference: request.reference,
            client_name: request.client_name,
            declared_value: request.declared_value,
            origin_country: request.origin_country,
        };
        let now = Utc::now();
        let draft = new.clone();

        self.coordinator
            .execute(role, SyncAction::CreateShipment(new), move |entries| {
                let shipment = Shipment::from_new(&draft, now)?;
                entries.insert(shipment.id.clone(), shipment);
                Ok(())
            })
            .await
    }

    pub async fn update_status(
        &self,
        role: ActorRole,
        id: &ShipmentId,
        status: ShipmentStatus,
    ) -> Result<MutationOutcome> {
        let action = SyncAction::UpdateStatus(UpdateStatusPayload {
            id: id.clone(),
            status: status.clone(),
        });
        let target = id.clone();
        let now = Utc::now();

        self.coordinator
            .execute(role, action, move |entries| {
                existing(entries, &target)?.set_status(status, now)
            })
            .await
    }

    pub async fn add_document(
        &self,
        role: ActorRole,
        id: &ShipmentId,
        kind: &str,
        file_name: &str,
    ) -> Result<MutationOutcome> {
        let document = ShipmentDocument {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
        };
        let action = SyncAction::AddDocument(AddDocumentPayload {
            id: id.clone(),
            document: document.clone(),
        });
        let target = id.clone();

        self.coordinator
            .execute(role, action, move |entries| {
                existing(entries, &target)?.add_document(document)
            })
            .await
    }

    /// Positive amounts are charges, negative amounts are credits.
    pub async fn add_ledger_entry(
        &self,
        role: ActorRole,
        id: &ShipmentId,
        amount: i64,
        description: Option<String>,
    ) -> Result<MutationOutcome> {
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            amount,
            description,
            recorded_at: Utc::now(),
        };
        let action = SyncAction::AddLedgerEntry(AddLedgerEntryPayload {
            id: id.clone(),
            entry_id: entry.id.clone(),
            amount: entry.amount,
            description: entry.description.clone(),
            recorded_at: entry.recorded_at,
        });
        let target = id.clone();

        self.coordinator
            .execute(role, action, move |entries| {
                existing(entries, &target)?.add_ledger_entry(entry)
            })
            .await
    }

    pub async fn pay_obligation(
        &self,
        role: ActorRole,
        id: &ShipmentId,
        obligation_id: &str,
        amount: i64,
    ) -> Result<MutationOutcome> {
        let paid_at = Utc::now();
        let action = SyncAction::PayObligation(PayObligationPayload {
            id: id.clone(),
            obligation_id: obligation_id.to_string(),
            amount,
            paid_at,
        });
        let target = id.clone();
        let obligation_id = obligation_id.to_string();

        self.coordinator
            .execute(role, action, move |entries| {
                existing(entries, &target)?.pay_obligation(&obligation_id, amount, paid_at)
            })
            .await
    }

    pub async fn update_fields(
        &self,
        role: ActorRole,
        id: &ShipmentId,
        fields: ShipmentFieldsPatch,
    ) -> Result<MutationOutcome> {
        let action = SyncAction::UpdateShipmentFields(UpdateShipmentFieldsPayload {
            id: id.clone(),
            fields: fields.clone(),
        });
        let target = id.clone();
        let now = Utc::now();

        self.coordinator
            .execute(role, action, move |entries| {
                existing(entries, &target)?.apply_fields(&fields, now)
            })
            .await
    }
}

fn existing<'a>(entries: &'a mut ShipmentMap, id: &ShipmentId) -> Result<&'a mut Shipment> {
    entries
        .get_mut(id)
        .ok_or_else(|| AppError::NotFound(format!("Shipment {id}")))
}
