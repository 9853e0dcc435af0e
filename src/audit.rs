// src/audit.rs
//
// Structured audit trail. Each mutating handler appends one row with typed
// columns (actor, section, action verb) and a JSON details payload; nothing
// is stringified and reparsed later. Writes are best-effort: a failed audit
// insert is logged and never fails the originating request.

use sqlx::PgPool;
use crate::middleware::auth::AuthContext;

pub async fn record(
    pool: &PgPool,
    auth: &AuthContext,
    section: &str,
    action: &str,
    details: serde_json::Value,
) {
    let result = sqlx::query(
        r#"INSERT INTO audit_logs (actor_id, actor_email, section, action, details)
           VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(auth.user_id)
    .bind(&auth.email)
    .bind(section)
    .bind(action)
    .bind(&details)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(error=?e, %section, %action, "Failed to write audit log entry");
    }
}
