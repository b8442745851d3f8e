use crate::domain::entities::QueuedAction;
use crate::domain::value_objects::QueuedActionId;
use crate::shared::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// A stored entry that no longer decodes into a `QueuedAction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorruptEntry {
    pub action_id: String,
    pub action_type: String,
    pub error: String,
}

/// One ordered read of the log. Undecodable entries are reported, not fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogScan {
    pub actions: Vec<QueuedAction>,
    pub corrupt: Vec<CorruptEntry>,
}

impl LogScan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.corrupt.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len() + self.corrupt.len()
    }
}

/// Durable, insertion-ordered store of pending actions.
///
/// Implementations must have persisted the action when `append` resolves and
/// must never reorder entries on `update`.
#[async_trait]
pub trait ActionLog: Send + Sync {
    async fn append(&self, action: &QueuedAction) -> Result<QueuedActionId>;
    /// Every entry, oldest first, split into decodable actions and corrupt rows.
    async fn scan(&self) -> Result<LogScan>;
    /// Decodable pending actions, oldest first.
    async fn list_all(&self) -> Result<Vec<QueuedAction>> {
        Ok(self.scan().await?.actions)
    }
    /// Removing an id that is no longer present is not an error.
    async fn remove(&self, id: &QueuedActionId) -> Result<()>;
    /// Deletes a corrupt entry by its stored id.
    async fn discard_corrupt(&self, entry: &CorruptEntry) -> Result<()>;
    async fn update(&self, action: &QueuedAction) -> Result<()>;
    async fn size(&self) -> Result<u64>;
    /// Drops every pending action and returns how many were discarded.
    async fn clear(&self) -> Result<u64>;
}
