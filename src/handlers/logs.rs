use axum::{extract::{Query, State}, Json};

use crate::dtos::logs::{AuditLogResponse, LogQueryParams};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 200;
const MAX_LIMIT: i64 = 1000;

pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<Vec<AuditLogResponse>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let base = r#"SELECT id, actor_id, actor_email, section, action, details, created_at
                  FROM audit_logs"#;
    let entries = match params.section {
        Some(section) => {
            sqlx::query_as::<_, AuditLogResponse>(&format!(
                "{base} WHERE section = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
            ))
            .bind(section)
            .bind(limit)
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, AuditLogResponse>(&format!(
                "{base} ORDER BY created_at DESC, id DESC LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(entries))
}
