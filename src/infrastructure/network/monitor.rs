use crate::application::ports::connectivity::ConnectivityProbe;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkTransition {
    WentOffline,
    CameOnline,
}

/// Reports connectivity and its edges. Holds no queue logic.
pub struct NetworkMonitor {
    state: watch::Sender<bool>,
    transitions: broadcast::Sender<NetworkTransition>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        let (transitions, _) = broadcast::channel(16);
        Self { state, transitions }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Feeds the platform signal. Returns the edge when the value changed.
    pub fn set_online(&self, online: bool) -> Option<NetworkTransition> {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if !changed {
            return None;
        }

        let transition = if online {
            NetworkTransition::CameOnline
        } else {
            NetworkTransition::WentOffline
        };
        tracing::info!(target: "sync::network", ?transition, "connectivity changed");
        // No subscribers is fine: the level is still readable via `is_online`.
        let _ = self.transitions.send(transition);
        Some(transition)
    }

    pub fn transitions(&self) -> broadcast::Receiver<NetworkTransition> {
        self.transitions.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn spawn_probe(
        self: &Arc<Self>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reachable = probe.is_reachable().await;
                monitor.set_online(reachable);
            }
        })
    }
}
