use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Shipment identifier. Locally created shipments carry a client-generated id
/// until the server confirms them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(String);

impl ShipmentId {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn generate_local() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Shipment ID cannot be empty".to_string());
        }
        if value.len() > 128 {
            return Err("Shipment ID is too long".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ShipmentId> for String {
    fn from(id: ShipmentId) -> Self {
        id.0
    }
}
