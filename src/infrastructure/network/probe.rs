use crate::application::ports::connectivity::ConnectivityProbe;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe address is empty")]
    EmptyAddress,

    #[error("Connection to {0} timed out")]
    Timeout(String),

    #[error("Connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        AppError::Network(err.to_string())
    }
}

/// Considers the backend reachable when a TCP connection can be opened.
pub struct TcpConnectivityProbe {
    address: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(ProbeError::EmptyAddress);
        }
        Ok(Self { address, timeout })
    }

    pub async fn check(&self) -> Result<(), ProbeError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(source)) => Err(ProbeError::Connect {
                address: self.address.clone(),
                source,
            }),
            Err(_) => Err(ProbeError::Timeout(self.address.clone())),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        match self.check().await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(target: "sync::network", error = %err, "backend unreachable");
                false
            }
        }
    }
}
