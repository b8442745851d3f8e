pub mod optimistic;
pub mod queue_events;
pub mod shipment_service;
pub mod shipment_store;
pub mod sync_queue_service;

pub use optimistic::{EntitySnapshot, MutationOutcome, OptimisticCoordinator, ReplayReconciler};
pub use queue_events::{
    FlushReport, FlushSkipReason, PermanentLossReport, QueueEvent, QueueEventKind, QueueListener,
    QueueSubscription,
};
pub use shipment_service::{CreateShipmentRequest, ShipmentService};
pub use shipment_store::{ShipmentMap, ShipmentStore};
pub use sync_queue_service::SyncQueueService;
