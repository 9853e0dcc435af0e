use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    pub section: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AuditLogResponse {
    pub id: i64,
    pub actor_id: i64,
    pub actor_email: String,
    pub section: String,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}
