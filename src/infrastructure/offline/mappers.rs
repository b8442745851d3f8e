use super::rows::QueuedActionRow;
use crate::domain::entities::{MutationKind, QueuedAction, SyncAction};
use crate::domain::value_objects::QueuedActionId;
use crate::shared::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Column values written for one queued action.
pub struct QueuedActionColumns {
    pub action_id: String,
    pub action_type: &'static str,
    pub payload: String,
    pub created_at: String,
    pub retry_count: i64,
    pub last_error: Option<String>,
}

pub fn columns_from_action(action: &QueuedAction) -> Result<QueuedActionColumns> {
    let payload = action.action.payload_json()?;

    Ok(QueuedActionColumns {
        action_id: action.id.to_string(),
        action_type: action.kind().as_str(),
        payload: serde_json::to_string(&payload)?,
        created_at: action.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        retry_count: i64::from(action.retries),
        last_error: action.last_error.clone(),
    })
}

pub fn action_from_row(row: QueuedActionRow) -> Result<QueuedAction> {
    let id = QueuedActionId::parse(&row.action_id).map_err(AppError::DeserializationError)?;
    let kind =
        MutationKind::try_from(row.action_type.as_str()).map_err(AppError::DeserializationError)?;
    let payload: serde_json::Value = serde_json::from_str(&row.payload).map_err(|err| {
        AppError::DeserializationError(format!(
            "Invalid payload for queued action {}: {err}",
            row.action_id
        ))
    })?;
    let action = SyncAction::from_parts(kind, payload).map_err(|err| {
        AppError::DeserializationError(format!(
            "Payload of queued action {} does not match {kind}: {err}",
            row.action_id
        ))
    })?;
    let timestamp = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| {
            AppError::DeserializationError(format!(
                "Invalid timestamp for queued action {}: {err}",
                row.action_id
            ))
        })?;

    Ok(QueuedAction {
        id,
        action,
        timestamp,
        retries: u32::try_from(row.retry_count).unwrap_or(0),
        last_error: row.last_error,
    })
}
