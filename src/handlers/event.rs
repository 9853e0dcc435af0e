use axum::{extract::{Path, State}, http::StatusCode, Extension, Json};
use serde_json::json;

use crate::audit;
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse};
use crate::dtos::event::{CreateEventRequest, EventResponse, UpdateEventRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Events";

pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::validation("Event title is required"));
    }
    if payload.end_at < payload.start_at {
        return Err(AppError::validation("Event cannot end before it starts"));
    }

    let rec = sqlx::query_as::<_, EventResponse>(
        r#"INSERT INTO events (title, description, start_at, end_at, venue, status)
           VALUES ($1, $2, $3, $4, $5, 'Scheduled')
           RETURNING id, title, description, start_at, end_at, venue, status, created_at"#,
    )
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.start_at)
    .bind(payload.end_at)
    .bind(&payload.venue)
    .fetch_one(&state.db_pool)
    .await?;

    audit::record(&state.db_pool, &auth, SECTION, "Created", json!({ "title": rec.title })).await;
    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = sqlx::query_as::<_, EventResponse>(
        r#"SELECT id, title, description, start_at, end_at, venue, status, created_at
           FROM events ORDER BY start_at DESC"#,
    )
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventResponse>, AppError> {
    let event = sqlx::query_as::<_, EventResponse>(
        r#"SELECT id, title, description, start_at, end_at, venue, status, created_at
           FROM events WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Event not found"))?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let rec = sqlx::query_as::<_, EventResponse>(
        r#"UPDATE events SET
               title = COALESCE($1, title),
               description = COALESCE($2, description),
               start_at = COALESCE($3, start_at),
               end_at = COALESCE($4, end_at),
               venue = COALESCE($5, venue),
               status = COALESCE($6, status)
           WHERE id = $7 AND COALESCE($4, end_at) >= COALESCE($3, start_at)
           RETURNING id, title, description, start_at, end_at, venue, status, created_at"#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.start_at)
    .bind(payload.end_at)
    .bind(&payload.venue)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Event not found"))?;

    audit::record(&state.db_pool, &auth, SECTION, "Updated", json!({ "title": rec.title })).await;
    Ok(Json(rec))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM events WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&state.db_pool)
        .await?;
    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Bulk deleted",
        json!({ "ids": payload.ids, "deleted": result.rows_affected() }),
    )
    .await;
    Ok(Json(BulkDeleteResponse { deleted: result.rows_affected() }))
}
