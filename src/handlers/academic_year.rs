use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;

use crate::audit;
use crate::dtos::academic_year::{
    AcademicYearResponse, CreateAcademicYearRequest, UpdateAcademicYearRequest,
};
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse};
use crate::error::{map_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

pub const SINGLE_ACTIVE_MESSAGE: &str = "There can only be one active AcademicYear.";

const SECTION: &str = "Academic Year";

/// Parses a "SY 2023-2024" label into its start/end years; the end year must
/// be exactly one after the start.
pub fn parse_school_year(label: &str) -> Result<(i32, i32), AppError> {
    let rest = label
        .trim()
        .strip_prefix("SY ")
        .ok_or_else(|| AppError::validation("School year must look like 'SY 2023-2024'"))?;
    let (start, end) = rest
        .split_once('-')
        .ok_or_else(|| AppError::validation("School year must look like 'SY 2023-2024'"))?;
    let start: i32 = start
        .trim()
        .parse()
        .map_err(|_| AppError::validation("School year must look like 'SY 2023-2024'"))?;
    let end: i32 = end
        .trim()
        .parse()
        .map_err(|_| AppError::validation("School year must look like 'SY 2023-2024'"))?;
    if end != start + 1 {
        return Err(AppError::validation(
            "School year end must be one year after the start",
        ));
    }
    Ok((start, end))
}

/// Resolves a human-readable school-year label to the internal academic-year
/// id. Every label-carrying domain goes through here; a miss is the
/// referential 400.
pub async fn resolve_academic_year(pool: &PgPool, label: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM academic_years WHERE school_year = $1")
        .bind(label.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(AppError::invalid_academic_year)
}

fn validate_status(status: &str) -> Result<(), AppError> {
    match status {
        "Active" | "Completed" | "Planned" => Ok(()),
        _ => Err(AppError::validation(
            "Status must be 'Active', 'Completed' or 'Planned'",
        )),
    }
}

// ==================== Create ====================

#[instrument(skip(state, auth, payload))]
pub async fn create_academic_year(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateAcademicYearRequest>,
) -> Result<(StatusCode, Json<AcademicYearResponse>), AppError> {
    let (start_year, end_year) = parse_school_year(&payload.school_year)?;
    let status = payload.status.unwrap_or_else(|| "Planned".to_string());
    validate_status(&status)?;

    let mut tx = state.db_pool.begin().await?;

    // Only one academic year may be Active at a time
    if status == "Active" {
        let active_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM academic_years WHERE status = 'Active')",
        )
        .fetch_one(&mut *tx)
        .await?;
        if active_exists {
            return Err(AppError::validation(SINGLE_ACTIVE_MESSAGE));
        }
    }

    let rec = sqlx::query_as::<_, AcademicYearResponse>(
        r#"INSERT INTO academic_years (school_year, start_year, end_year, status)
           VALUES ($1, $2, $3, $4)
           RETURNING id, school_year, start_year, end_year, status, created_at"#,
    )
    .bind(payload.school_year.trim())
    .bind(start_year)
    .bind(end_year)
    .bind(&status)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "Academic year already exists"))?;

    tx.commit().await?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({ "school_year": rec.school_year, "status": rec.status }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

// ==================== Fetch ====================

pub async fn list_academic_years(
    State(state): State<AppState>,
) -> Result<Json<Vec<AcademicYearResponse>>, AppError> {
    let years = sqlx::query_as::<_, AcademicYearResponse>(
        r#"SELECT id, school_year, start_year, end_year, status, created_at
           FROM academic_years ORDER BY start_year DESC"#,
    )
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(years))
}

pub async fn get_academic_year(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AcademicYearResponse>, AppError> {
    let year = sqlx::query_as::<_, AcademicYearResponse>(
        r#"SELECT id, school_year, start_year, end_year, status, created_at
           FROM academic_years WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Academic year not found"))?;
    Ok(Json(year))
}

// ==================== Update ====================

#[instrument(skip(state, auth, payload))]
pub async fn update_academic_year(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAcademicYearRequest>,
) -> Result<Json<AcademicYearResponse>, AppError> {
    validate_status(&payload.status)?;

    let mut tx = state.db_pool.begin().await?;

    if payload.status == "Active" {
        let other_active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM academic_years WHERE status = 'Active' AND id <> $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if other_active {
            return Err(AppError::validation(SINGLE_ACTIVE_MESSAGE));
        }
    }

    let rec = sqlx::query_as::<_, AcademicYearResponse>(
        r#"UPDATE academic_years SET status = $1 WHERE id = $2
           RETURNING id, school_year, start_year, end_year, status, created_at"#,
    )
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Academic year not found"))?;

    tx.commit().await?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Updated",
        json!({ "school_year": rec.school_year, "status": rec.status }),
    )
    .await;

    Ok(Json(rec))
}

// ==================== Delete ====================

pub async fn delete_academic_year(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM academic_years WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Academic year not found"));
    }

    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_academic_years(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM academic_years WHERE id = ANY($1)")
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

    Ok(Json(BulkDeleteResponse {
        deleted: result.rows_affected(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_label_parses() {
        assert_eq!(parse_school_year("SY 2023-2024").unwrap(), (2023, 2024));
        assert_eq!(parse_school_year("  SY 1999-2000 ").unwrap(), (1999, 2000));
    }

    #[test]
    fn non_consecutive_years_are_rejected() {
        assert!(parse_school_year("SY 2023-2025").is_err());
        assert!(parse_school_year("SY 2024-2023").is_err());
    }

    #[test]
    fn malformed_labels_are_rejected() {
        assert!(parse_school_year("2023-2024").is_err());
        assert!(parse_school_year("SY 2023/2024").is_err());
        assert!(parse_school_year("SY abcd-efgh").is_err());
        assert!(parse_school_year("").is_err());
    }
}
