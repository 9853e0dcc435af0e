use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;
use tracing::instrument;

use crate::audit;
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse, SchoolYearFilter};
use crate::dtos::deworming::{
    CreateDewormingReportRequest, DewormingReportResponse, UpdateDewormingReportRequest,
};
use crate::error::{map_unique_violation, AppError};
use crate::handlers::academic_year::resolve_academic_year;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Deworming";
const DUPLICATE_MESSAGE: &str = "A deworming report already exists for this grade and academic year";

fn validate_counts(enrolled: i32, male: i32, female: i32) -> Result<(), AppError> {
    if enrolled < 0 || male < 0 || female < 0 {
        return Err(AppError::validation("Counts cannot be negative"));
    }
    if male + female > enrolled {
        return Err(AppError::validation(
            "Dewormed count cannot exceed enrolled count",
        ));
    }
    Ok(())
}

const SELECT_COLUMNS: &str = r#"
    dr.id, dr.grade, dr.enrolled, dr.dewormed_male, dr.dewormed_female,
    ay.school_year, dr.created_at"#;

#[instrument(skip(state, auth, payload), fields(grade = %payload.grade))]
pub async fn create_deworming_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateDewormingReportRequest>,
) -> Result<(StatusCode, Json<DewormingReportResponse>), AppError> {
    validate_counts(payload.enrolled, payload.dewormed_male, payload.dewormed_female)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, DewormingReportResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO deworming_reports
                   (grade, enrolled, dewormed_male, dewormed_female, academic_year_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted dr JOIN academic_years ay ON dr.academic_year_id = ay.id"#
    ))
    .bind(&payload.grade)
    .bind(payload.enrolled)
    .bind(payload.dewormed_male)
    .bind(payload.dewormed_female)
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, DUPLICATE_MESSAGE))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({ "grade": rec.grade, "school_year": rec.school_year }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_deworming_reports(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<DewormingReportResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM deworming_reports dr
           JOIN academic_years ay ON dr.academic_year_id = ay.id"#
    );
    let reports = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, DewormingReportResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY dr.grade"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DewormingReportResponse>(&format!("{base} ORDER BY dr.grade"))
                .fetch_all(&state.db_pool)
                .await?
        }
    };
    Ok(Json(reports))
}

pub async fn get_deworming_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DewormingReportResponse>, AppError> {
    let report = sqlx::query_as::<_, DewormingReportResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM deworming_reports dr
           JOIN academic_years ay ON dr.academic_year_id = ay.id
           WHERE dr.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Deworming report not found"))?;
    Ok(Json(report))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_deworming_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDewormingReportRequest>,
) -> Result<Json<DewormingReportResponse>, AppError> {
    let current = sqlx::query_as::<_, (i32, i32, i32)>(
        "SELECT enrolled, dewormed_male, dewormed_female FROM deworming_reports WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Deworming report not found"))?;

    let enrolled = payload.enrolled.unwrap_or(current.0);
    let male = payload.dewormed_male.unwrap_or(current.1);
    let female = payload.dewormed_female.unwrap_or(current.2);
    validate_counts(enrolled, male, female)?;

    let rec = sqlx::query_as::<_, DewormingReportResponse>(&format!(
        r#"WITH updated AS (
               UPDATE deworming_reports SET
                   enrolled = $1, dewormed_male = $2, dewormed_female = $3
               WHERE id = $4
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated dr JOIN academic_years ay ON dr.academic_year_id = ay.id"#
    ))
    .bind(enrolled)
    .bind(male)
    .bind(female)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Deworming report not found"))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Updated",
        json!({ "grade": rec.grade, "school_year": rec.school_year }),
    )
    .await;

    Ok(Json(rec))
}

pub async fn delete_deworming_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM deworming_reports WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Deworming report not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_deworming_reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM deworming_reports WHERE id = ANY($1)")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dewormed_totals_cannot_exceed_enrollment() {
        assert!(validate_counts(100, 45, 50).is_ok());
        assert!(validate_counts(100, 55, 50).is_err());
        assert!(validate_counts(-1, 0, 0).is_err());
    }
}
