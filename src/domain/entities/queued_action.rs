use crate::domain::entities::sync_action::{MutationKind, SyncAction};
use crate::domain::value_objects::QueuedActionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mutation waiting in the action log for replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedAction {
    pub id: QueuedActionId,
    pub action: SyncAction,
    /// Creation time. Audit and ordering tie-break only.
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub last_error: Option<String>,
}

impl QueuedAction {
    pub fn new(action: SyncAction) -> Self {
        Self {
            id: QueuedActionId::generate(),
            action,
            timestamp: Utc::now(),
            retries: 0,
            last_error: None,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.action.kind()
    }

    /// Counts one failed execution attempt and returns the new retry count.
    pub fn record_failure(&mut self, message: impl Into<String>) -> u32 {
        self.retries = self.retries.saturating_add(1);
        self.last_error = Some(message.into());
        self.retries
    }

    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retries >= max_retries
    }
}
