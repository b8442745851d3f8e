use crate::domain::entities::{MutationKind, Shipment};
use crate::domain::value_objects::ActorRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny(String),
}

/// Role/state based permission rules. Synchronous so it can run inside the
/// atomic authorize-snapshot-apply section of a mutation.
pub trait PermissionEngine: Send + Sync {
    fn authorize(
        &self,
        kind: MutationKind,
        current: Option<&Shipment>,
        role: ActorRole,
    ) -> Authorization;
}
