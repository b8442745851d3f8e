use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct QueuedActionRow {
    pub action_id: String,
    pub action_type: String,
    pub payload: String,
    pub created_at: String,
    pub retry_count: i64,
    pub last_error: Option<String>,
}
