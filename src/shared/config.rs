use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub sync: SyncConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Seconds between background flush attempts. 0 disables the timer.
    pub sync_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// `host:port` of the backend used for reachability checks.
    #[serde(default)]
    pub probe_address: Option<String>,
    pub probe_interval: u64,
    pub probe_timeout: u64,
}

/// Retry schedule applied to queued actions during a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// `base_delay * 2^(retries-1)`, capped at `max_delay`.
    pub fn backoff_for(&self, retries: u32) -> Duration {
        let exponent = retries.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        QueueConfig::default().retry_policy()
    }
}

impl QueueConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/shipment_sync.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            queue: QueueConfig::default(),
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 300, // 5 minutes
            },
            network: NetworkConfig {
                probe_address: None,
                probe_interval: 15,
                probe_timeout: 5,
            },
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SHIPMENT_SYNC_DATABASE_URL")
            && !v.trim().is_empty()
        {
            cfg.database.url = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_MAX_RETRIES")
            && let Some(value) = parse_u32(&v)
        {
            cfg.queue.max_retries = value.max(1);
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_BASE_DELAY_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.queue.base_delay_ms = value;
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_MAX_DELAY_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.queue.max_delay_ms = value;
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.sync_interval = value;
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_PROBE_ADDRESS") {
            let trimmed = v.trim();
            cfg.network.probe_address = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Ok(v) = std::env::var("SHIPMENT_SYNC_PROBE_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.network.probe_interval = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.queue.max_retries == 0 {
            return Err("Queue max_retries must be greater than 0".to_string());
        }
        if self.queue.max_delay_ms < self.queue.base_delay_ms {
            return Err("Queue max_delay_ms must not be lower than base_delay_ms".to_string());
        }
        if self.network.probe_address.is_some() && self.network.probe_interval == 0 {
            return Err("Network probe_interval must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.queue.retry_policy()
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
