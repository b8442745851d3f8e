use crate::domain::entities::{Shipment, SyncAction};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Backend client that performs one mutation remotely.
///
/// Returns the server's canonical shipment after the mutation. Network and
/// server failures must be reported as `AppError::TransientRemote`, explicit
/// refusals as `AppError::RemoteRejected`.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, action: &SyncAction) -> Result<Shipment, AppError>;
}
