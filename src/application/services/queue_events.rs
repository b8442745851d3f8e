use crate::application::ports::action_log::CorruptEntry;
use crate::domain::entities::{MutationKind, QueueStats, QueuedAction, Shipment};
use crate::domain::value_objects::QueuedActionId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// A queued action dropped after exhausting its retries. Needs manual recovery.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermanentLossReport {
    pub action: QueuedAction,
    pub last_error: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlushSkipReason {
    Offline,
    AlreadyRunning,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub synced: usize,
    pub failed_attempts: usize,
    /// Permanent losses, corrupt entries included.
    pub lost: usize,
    /// The pass stopped early because connectivity dropped during a backoff.
    pub halted_offline: bool,
    pub skipped: Option<FlushSkipReason>,
}

impl FlushReport {
    pub fn skipped(reason: FlushSkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEventKind {
    Enqueued {
        action_id: QueuedActionId,
        kind: MutationKind,
    },
    FlushStarted {
        pending: u64,
    },
    ActionSynced {
        action: QueuedAction,
        shipment: Shipment,
    },
    ActionRetrying {
        action_id: QueuedActionId,
        retries: u32,
        error: String,
        backoff: Duration,
    },
    PermanentLoss(PermanentLossReport),
    /// A log entry that could not be decoded was removed without replay.
    CorruptEntryDropped(CorruptEntry),
    FlushFinished(FlushReport),
    Cleared {
        discarded: u64,
    },
}

/// Delivered to listeners after every queue state change.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub stats: QueueStats,
}

pub trait QueueListener: Send + Sync {
    fn on_event(&self, event: &QueueEvent);
}

impl<F> QueueListener for F
where
    F: Fn(&QueueEvent) + Send + Sync,
{
    fn on_event(&self, event: &QueueEvent) {
        self(event)
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Arc<dyn QueueListener>)>>,
}

impl ListenerRegistry {
    pub(crate) fn register(self: &Arc<Self>, listener: Arc<dyn QueueListener>) -> QueueSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.listeners.lock() {
            guard.push((id, listener));
        }
        QueueSubscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn unregister(&self, id: u64) {
        if let Ok(mut guard) = self.listeners.lock() {
            guard.retain(|(existing, _)| *existing != id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Listeners run outside the lock so they may unsubscribe themselves.
    pub(crate) fn dispatch(&self, event: &QueueEvent) {
        let listeners: Vec<Arc<dyn QueueListener>> = match self.listeners.lock() {
            Ok(guard) => guard.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

/// Handle returned by `subscribe`. The listener stays registered until
/// `unsubscribe` is called.
#[derive(Debug)]
pub struct QueueSubscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl QueueSubscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}
