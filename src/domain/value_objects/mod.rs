pub mod action_id;
pub mod actor_role;
pub mod shipment_id;
pub mod shipment_status;

pub use action_id::QueuedActionId;
pub use actor_role::ActorRole;
pub use shipment_id::ShipmentId;
pub use shipment_status::ShipmentStatus;
