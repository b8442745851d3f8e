pub mod action_log;
pub mod connectivity;
pub mod permission;
pub mod remote_executor;

pub use action_log::{ActionLog, CorruptEntry, LogScan};
pub use connectivity::ConnectivityProbe;
pub use permission::{Authorization, PermissionEngine};
pub use remote_executor::RemoteExecutor;
