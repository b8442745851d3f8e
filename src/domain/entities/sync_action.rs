use crate::domain::entities::shipment::{NewShipment, ShipmentDocument, ShipmentFieldsPatch};
use crate::domain::value_objects::{ShipmentId, ShipmentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a replayable mutation. Stored in the `action_type` column of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    CreateShipment,
    UpdateStatus,
    AddDocument,
    AddLedgerEntry,
    PayObligation,
    UpdateShipmentFields,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::CreateShipment => "CreateShipment",
            MutationKind::UpdateStatus => "UpdateStatus",
            MutationKind::AddDocument => "AddDocument",
            MutationKind::AddLedgerEntry => "AddLedgerEntry",
            MutationKind::PayObligation => "PayObligation",
            MutationKind::UpdateShipmentFields => "UpdateShipmentFields",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MutationKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CreateShipment" => Ok(MutationKind::CreateShipment),
            "UpdateStatus" => Ok(MutationKind::UpdateStatus),
            "AddDocument" => Ok(MutationKind::AddDocument),
            "AddLedgerEntry" => Ok(MutationKind::AddLedgerEntry),
            "PayObligation" => Ok(MutationKind::PayObligation),
            "UpdateShipmentFields" => Ok(MutationKind::UpdateShipmentFields),
            other => Err(format!("Unknown action type: {other}")),
        }
    }
}

/// A mutation described completely enough to be replayed against the backend
/// later. Serialized as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum SyncAction {
    CreateShipment(NewShipment),
    UpdateStatus(UpdateStatusPayload),
    AddDocument(AddDocumentPayload),
    AddLedgerEntry(AddLedgerEntryPayload),
    PayObligation(PayObligationPayload),
    UpdateShipmentFields(UpdateShipmentFieldsPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateStatusPayload {
    pub id: ShipmentId,
    pub status: ShipmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddDocumentPayload {
    pub id: ShipmentId,
    pub document: ShipmentDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddLedgerEntryPayload {
    pub id: ShipmentId,
    pub entry_id: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayObligationPayload {
    pub id: ShipmentId,
    pub obligation_id: String,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateShipmentFieldsPayload {
    pub id: ShipmentId,
    pub fields: ShipmentFieldsPatch,
}

impl SyncAction {
    pub fn kind(&self) -> MutationKind {
        match self {
            SyncAction::CreateShipment(_) => MutationKind::CreateShipment,
            SyncAction::UpdateStatus(_) => MutationKind::UpdateStatus,
            SyncAction::AddDocument(_) => MutationKind::AddDocument,
            SyncAction::AddLedgerEntry(_) => MutationKind::AddLedgerEntry,
            SyncAction::PayObligation(_) => MutationKind::PayObligation,
            SyncAction::UpdateShipmentFields(_) => MutationKind::UpdateShipmentFields,
        }
    }

    /// The shipment this action reads and writes.
    pub fn shipment_id(&self) -> &ShipmentId {
        match self {
            SyncAction::CreateShipment(new) => &new.id,
            SyncAction::UpdateStatus(payload) => &payload.id,
            SyncAction::AddDocument(payload) => &payload.id,
            SyncAction::AddLedgerEntry(payload) => &payload.id,
            SyncAction::PayObligation(payload) => &payload.id,
            SyncAction::UpdateShipmentFields(payload) => &payload.id,
        }
    }

    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        Ok(value
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }

    /// Rebuilds an action from its stored tag and payload.
    pub fn from_parts(kind: MutationKind, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({
            "type": kind.as_str(),
            "payload": payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_status_uses_tagged_layout() {
        let action = SyncAction::UpdateStatus(UpdateStatusPayload {
            id: ShipmentId::new("S1".into()).unwrap(),
            status: ShipmentStatus::Delivered,
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"type": "UpdateStatus", "payload": {"id": "S1", "status": "DELIVERED"}})
        );
        assert_eq!(action.kind(), MutationKind::UpdateStatus);
        assert_eq!(action.shipment_id().as_str(), "S1");
    }

    #[test]
    fn from_parts_restores_action() {
        let action = SyncAction::AddLedgerEntry(AddLedgerEntryPayload {
            id: ShipmentId::new("S1".into()).unwrap(),
            entry_id: "e1".into(),
            amount: 500,
            description: None,
            recorded_at: Utc::now(),
        });
        let payload = action.payload_json().unwrap();
        assert_eq!(payload["amount"], json!(500));

        let restored = SyncAction::from_parts(action.kind(), payload).unwrap();
        assert_eq!(restored, action);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(MutationKind::try_from("DeleteEverything").is_err());
        assert_eq!(
            MutationKind::try_from("PayObligation").unwrap(),
            MutationKind::PayObligation
        );
    }
}
