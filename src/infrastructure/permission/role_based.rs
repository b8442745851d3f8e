use crate::application::ports::permission::{Authorization, PermissionEngine};
use crate::domain::entities::{MutationKind, Shipment};
use crate::domain::value_objects::ActorRole;

/// Minimum role needed for each mutation, plus the rule that closed
/// shipments only accept ledger and payment work from accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleBasedPermissions;

impl RoleBasedPermissions {
    pub fn new() -> Self {
        Self
    }

    fn role_allows(kind: MutationKind, role: ActorRole) -> bool {
        match role {
            ActorRole::Admin => true,
            ActorRole::Agent => !matches!(kind, MutationKind::PayObligation),
            ActorRole::Accountant => matches!(
                kind,
                MutationKind::AddLedgerEntry | MutationKind::PayObligation
            ),
            ActorRole::Viewer => false,
        }
    }
}

impl PermissionEngine for RoleBasedPermissions {
    fn authorize(
        &self,
        kind: MutationKind,
        current: Option<&Shipment>,
        role: ActorRole,
    ) -> Authorization {
        if !Self::role_allows(kind, role) {
            return Authorization::Deny(format!("role {role:?} may not perform {kind}"));
        }

        match (kind, current) {
            (MutationKind::CreateShipment, Some(existing)) => {
                Authorization::Deny(format!("shipment {} already exists", existing.id))
            }
            (MutationKind::CreateShipment, None) => Authorization::Allow,
            (_, None) => Authorization::Deny("shipment is not loaded on this device".to_string()),
            (MutationKind::AddLedgerEntry | MutationKind::PayObligation, Some(_)) => {
                Authorization::Allow
            }
            (_, Some(shipment)) if shipment.status.is_terminal() && role != ActorRole::Admin => {
                Authorization::Deny(format!(
                    "shipment {} is {} and locked for editing",
                    shipment.id, shipment.status
                ))
            }
            (_, Some(_)) => Authorization::Allow,
        }
    }
}
