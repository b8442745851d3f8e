pub mod queue_stats;
pub mod queued_action;
pub mod shipment;
pub mod sync_action;

pub use queue_stats::QueueStats;
pub use queued_action::QueuedAction;
pub use shipment::{
    LedgerEntry, NewShipment, Obligation, Shipment, ShipmentDocument, ShipmentFieldsPatch,
};
pub use sync_action::{
    AddDocumentPayload, AddLedgerEntryPayload, MutationKind, PayObligationPayload, SyncAction,
    UpdateShipmentFieldsPayload, UpdateStatusPayload,
};
