use axum::{extract::{Path, State}, http::StatusCode, Extension, Json};
use serde_json::json;

use crate::audit;
use crate::dtos::role::{CreateRoleRequest, RoleResponse, UpdateRoleRequest};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Role";

pub async fn create_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Role name is required"));
    }

    let rec = sqlx::query_as::<_, RoleResponse>(
        r#"INSERT INTO roles (name, description, status)
           VALUES ($1, $2, 'Active')
           RETURNING id, name, description, status, created_at"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Role already exists"))?;

    audit::record(&state.db_pool, &auth, SECTION, "Created", json!({ "name": rec.name })).await;
    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleResponse>>, AppError> {
    let roles = sqlx::query_as::<_, RoleResponse>(
        "SELECT id, name, description, status, created_at FROM roles ORDER BY name",
    )
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(roles))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, AppError> {
    let rec = sqlx::query_as::<_, RoleResponse>(
        r#"UPDATE roles SET
               name = COALESCE($1, name),
               description = COALESCE($2, description),
               status = COALESCE($3, status)
           WHERE id = $4
           RETURNING id, name, description, status, created_at"#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Role not found"))?;

    audit::record(&state.db_pool, &auth, SECTION, "Updated", json!({ "name": rec.name })).await;
    Ok(Json(rec))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    // A role still referenced by users must not disappear
    let in_use = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users u JOIN roles r ON u.role = r.name WHERE r.id = $1)",
    )
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;
    if in_use {
        return Err(AppError::conflict("Role is assigned to existing users"));
    }

    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Role not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}
