use crate::domain::value_objects::{ShipmentId, ShipmentStatus};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: ShipmentId,
    pub reference: String,
    pub client_name: String,
    pub status: ShipmentStatus,
    /// Declared customs value in minor currency units.
    pub declared_value: i64,
    pub origin_country: String,
    #[serde(default)]
    pub documents: Vec<ShipmentDocument>,
    #[serde(default)]
    pub ledger: Vec<LedgerEntry>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    /// Server-side revision; local edits never bump it.
    #[serde(default)]
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentDocument {
    pub id: String,
    pub kind: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A payable item (duty, fee, freight) attached to a shipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligation {
    pub id: String,
    pub label: String,
    pub amount_due: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Obligation {
    pub fn outstanding(&self) -> i64 {
        (self.amount_due - self.amount_paid).max(0)
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding() == 0
    }
}

/// Field values supplied when a shipment is created on this device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewShipment {
    pub id: ShipmentId,
    pub reference: String,
    pub client_name: String,
    pub declared_value: i64,
    pub origin_country: String,
}

/// Partial update of the editable shipment fields. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
}

impl ShipmentFieldsPatch {
    pub fn is_empty(&self) -> bool {
        self.reference.is_none()
            && self.client_name.is_none()
            && self.declared_value.is_none()
            && self.origin_country.is_none()
    }
}

impl Shipment {
    pub fn from_new(new: &NewShipment, now: DateTime<Utc>) -> Result<Self, AppError> {
        validate_reference(&new.reference)?;
        validate_declared_value(new.declared_value)?;
        if new.client_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Client name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: new.id.clone(),
            reference: new.reference.trim().to_string(),
            client_name: new.client_name.trim().to_string(),
            status: ShipmentStatus::Draft,
            declared_value: new.declared_value,
            origin_country: new.origin_country.trim().to_uppercase(),
            documents: Vec::new(),
            ledger: Vec::new(),
            obligations: Vec::new(),
            version: 0,
            updated_at: now,
        })
    }

    pub fn set_status(&mut self, status: ShipmentStatus, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::ValidationError(format!(
                "Shipment {} is {} and cannot change status",
                self.id, self.status
            )));
        }
        if let ShipmentStatus::Unknown(value) = &status {
            return Err(AppError::ValidationError(format!(
                "Unknown shipment status: {value}"
            )));
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn add_document(&mut self, document: ShipmentDocument) -> Result<(), AppError> {
        if document.file_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Document file name cannot be empty".to_string(),
            ));
        }
        if self.documents.iter().any(|existing| existing.id == document.id) {
            return Err(AppError::ValidationError(format!(
                "Document {} is already attached",
                document.id
            )));
        }
        self.updated_at = document.uploaded_at;
        self.documents.push(document);
        Ok(())
    }

    pub fn add_ledger_entry(&mut self, entry: LedgerEntry) -> Result<(), AppError> {
        if entry.amount == 0 {
            return Err(AppError::ValidationError(
                "Ledger entry amount cannot be zero".to_string(),
            ));
        }
        if self.ledger.iter().any(|existing| existing.id == entry.id) {
            return Err(AppError::ValidationError(format!(
                "Ledger entry {} already exists",
                entry.id
            )));
        }
        self.updated_at = entry.recorded_at;
        self.ledger.push(entry);
        Ok(())
    }

    pub fn pay_obligation(
        &mut self,
        obligation_id: &str,
        amount: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        let obligation = self
            .obligations
            .iter_mut()
            .find(|item| item.id == obligation_id)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Obligation {obligation_id} does not exist on shipment {}",
                    self.id
                ))
            })?;
        if amount > obligation.outstanding() {
            return Err(AppError::ValidationError(format!(
                "Payment of {amount} exceeds outstanding {} for obligation {obligation_id}",
                obligation.outstanding()
            )));
        }
        obligation.amount_paid += amount;
        if obligation.is_settled() {
            obligation.paid_at = Some(paid_at);
        }
        self.updated_at = paid_at;
        Ok(())
    }

    pub fn apply_fields(&mut self, patch: &ShipmentFieldsPatch, now: DateTime<Utc>) -> Result<(), AppError> {
        if patch.is_empty() {
            return Err(AppError::ValidationError(
                "No fields to update".to_string(),
            ));
        }
        if let Some(reference) = &patch.reference {
            validate_reference(reference)?;
            self.reference = reference.trim().to_string();
        }
        if let Some(client_name) = &patch.client_name {
            if client_name.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Client name cannot be empty".to_string(),
                ));
            }
            self.client_name = client_name.trim().to_string();
        }
        if let Some(value) = patch.declared_value {
            validate_declared_value(value)?;
            self.declared_value = value;
        }
        if let Some(country) = &patch.origin_country {
            self.origin_country = country.trim().to_uppercase();
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn ledger_balance(&self) -> i64 {
        self.ledger.iter().map(|entry| entry.amount).sum()
    }
}

fn validate_reference(reference: &str) -> Result<(), AppError> {
    if reference.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Shipment reference cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_declared_value(value: i64) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::ValidationError(
            "Declared value cannot be negative".to_string(),
        ));
    }
    Ok(())
}
