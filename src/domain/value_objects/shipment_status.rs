use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShipmentStatus {
    Draft,
    Submitted,
    InTransit,
    AtCustoms,
    Cleared,
    Delivered,
    Cancelled,
    Unknown(String),
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ShipmentStatus::Draft => "DRAFT",
            ShipmentStatus::Submitted => "SUBMITTED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::AtCustoms => "AT_CUSTOMS",
            ShipmentStatus::Cleared => "CLEARED",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Cancelled => "CANCELLED",
            ShipmentStatus::Unknown(value) => value.as_str(),
        }
    }

    /// Delivered and cancelled shipments accept no further status changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }
}

impl From<&str> for ShipmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "DRAFT" => ShipmentStatus::Draft,
            "SUBMITTED" => ShipmentStatus::Submitted,
            "IN_TRANSIT" => ShipmentStatus::InTransit,
            "AT_CUSTOMS" => ShipmentStatus::AtCustoms,
            "CLEARED" => ShipmentStatus::Cleared,
            "DELIVERED" => ShipmentStatus::Delivered,
            "CANCELLED" => ShipmentStatus::Cancelled,
            other => ShipmentStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShipmentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShipmentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ShipmentStatus::from(value.as_str()))
    }
}
