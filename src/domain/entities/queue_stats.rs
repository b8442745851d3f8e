use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of the queue, recomputed on every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: u64,
    pub processing: bool,
    /// End of the most recent flush pass.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Last flush that drained a non-empty log completely.
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
