pub mod config;
pub mod error;
pub mod metrics;

pub use config::{AppConfig, RetryPolicy};
pub use error::{AppError, Result};
