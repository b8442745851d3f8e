pub mod monitor;
pub mod probe;

pub use monitor::{NetworkMonitor, NetworkTransition};
pub use probe::{ProbeError, TcpConnectivityProbe};
