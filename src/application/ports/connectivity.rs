use async_trait::async_trait;

/// Platform reachability primitive polled by the network monitor.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
