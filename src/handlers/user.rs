use bcrypt::{hash, DEFAULT_COST};
use axum::{extract::{Path, State}, http::StatusCode, Extension, Json};
use serde_json::json;

use crate::audit;
use crate::dtos::user::{RegisterUserRequest, UpdateUserRequest, UserResponse};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "User";

pub async fn register_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    // Basic validation
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::validation("A valid email is required"));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::validation("Password must be at least 8 characters"));
    }

    let role_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND status = 'Active')",
    )
    .bind(&payload.role)
    .fetch_one(&state.db_pool)
    .await?;
    if !role_exists {
        return Err(AppError::validation("Unknown role"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let rec = sqlx::query_as::<_, UserResponse>(
        r#"INSERT INTO users (first_name, last_name, email, password_hash, role, status)
           VALUES ($1, $2, $3, $4, $5, 'Active')
           RETURNING id, first_name, last_name, email, role, status, created_at"#,
    )
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(&payload.role)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Email already registered"))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({ "email": rec.email, "role": rec.role }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = sqlx::query_as::<_, UserResponse>(
        r#"SELECT id, first_name, last_name, email, role, status, created_at
           FROM users ORDER BY last_name, first_name"#,
    )
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(users))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let rec = sqlx::query_as::<_, UserResponse>(
        r#"UPDATE users SET
               first_name = COALESCE($1, first_name),
               last_name = COALESCE($2, last_name),
               role = COALESCE($3, role),
               status = COALESCE($4, status)
           WHERE id = $5
           RETURNING id, first_name, last_name, email, role, status, created_at"#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.role)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    audit::record(&state.db_pool, &auth, SECTION, "Updated", json!({ "email": rec.email })).await;
    Ok(Json(rec))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if id == auth.user_id {
        return Err(AppError::validation("Cannot delete the signed-in account"));
    }
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

// Authenticated endpoint: returns the signed-in user's profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let rec = sqlx::query_as::<_, UserResponse>(
        r#"SELECT id, first_name, last_name, email, role, status, created_at
           FROM users WHERE id = $1"#,
    )
    .bind(auth.user_id)
    .fetch_one(&state.db_pool)
    .await?;
    Ok(Json(rec))
}
