use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;
use tracing::instrument;

use crate::audit;
use crate::dtos::clinic_visit::{
    ClinicVisitResponse, CreateClinicVisitRequest, UpdateClinicVisitRequest,
};
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse, SchoolYearFilter};
use crate::error::AppError;
use crate::handlers::academic_year::resolve_academic_year;
use crate::handlers::medicine_inventory::check_availability_for_deduction;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Clinic Visit";

const SELECT_COLUMNS: &str = r#"
    cv.id, cv.patient_name, cv.patient_type, cv.lrn, cv.grade, cv.visit_date,
    cv.malady, cv.reason, cv.treatment, cv.item_id, cv.batch_id, cv.quantity,
    cv.status, ay.school_year, cv.created_at"#;

// ==================== Create ====================

/// Creating a visit that references a medicine runs the stock availability
/// check and records the dispense in the same transaction as the visit row;
/// a rejection leaves both collections untouched.
#[instrument(skip(state, auth, payload), fields(patient = %payload.patient_name))]
pub async fn create_clinic_visit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateClinicVisitRequest>,
) -> Result<(StatusCode, Json<ClinicVisitResponse>), AppError> {
    if payload.patient_name.trim().is_empty() {
        return Err(AppError::validation("Patient name is required"));
    }
    if payload.patient_type != "Student" && payload.patient_type != "Employee" {
        return Err(AppError::validation("Patient type must be 'Student' or 'Employee'"));
    }
    if payload.malady.trim().is_empty() {
        return Err(AppError::validation("Malady is required"));
    }

    // A medicine reference must be complete: item, batch and quantity together
    let medicine_ref = match (&payload.item_id, &payload.batch_id, payload.quantity) {
        (Some(item), Some(batch), Some(qty)) => Some((item.trim(), batch.trim(), qty)),
        (None, None, None) => None,
        _ => {
            return Err(AppError::validation(
                "Medicine reference requires item_id, batch_id and quantity together",
            ))
        }
    };

    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let mut tx = state.db_pool.begin().await?;

    if let Some((item_id, batch_id, quantity)) = medicine_ref {
        check_availability_for_deduction(&mut tx, item_id, batch_id, quantity).await?;

        sqlx::query(
            r#"INSERT INTO medicine_dispenses (item_id, batch_id, quantity, reason, status)
               VALUES ($1, $2, $3, $4, 'Active')"#,
        )
        .bind(item_id)
        .bind(batch_id)
        .bind(quantity)
        .bind(format!("Clinic visit: {}", payload.malady.trim()))
        .execute(&mut *tx)
        .await?;
    }

    let rec = sqlx::query_as::<_, ClinicVisitResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO clinic_visits
                   (patient_name, patient_type, lrn, grade, visit_date, malady,
                    reason, treatment, item_id, batch_id, quantity, status,
                    academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'Active', $12)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted cv JOIN academic_years ay ON cv.academic_year_id = ay.id"#
    ))
    .bind(payload.patient_name.trim())
    .bind(&payload.patient_type)
    .bind(&payload.lrn)
    .bind(&payload.grade)
    .bind(payload.visit_date)
    .bind(payload.malady.trim())
    .bind(&payload.reason)
    .bind(&payload.treatment)
    .bind(medicine_ref.map(|(item, _, _)| item.to_string()))
    .bind(medicine_ref.map(|(_, batch, _)| batch.to_string()))
    .bind(medicine_ref.map(|(_, _, qty)| qty))
    .bind(academic_year_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({
            "patient_name": rec.patient_name,
            "malady": rec.malady,
            "dispensed": rec.quantity,
            "school_year": rec.school_year
        }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

// ==================== Fetch ====================

pub async fn list_clinic_visits(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<ClinicVisitResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM clinic_visits cv
           JOIN academic_years ay ON cv.academic_year_id = ay.id"#
    );
    let visits = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, ClinicVisitResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY cv.visit_date DESC, cv.id DESC"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ClinicVisitResponse>(&format!(
                "{base} ORDER BY cv.visit_date DESC, cv.id DESC"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(visits))
}

pub async fn get_clinic_visit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ClinicVisitResponse>, AppError> {
    let visit = sqlx::query_as::<_, ClinicVisitResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM clinic_visits cv
           JOIN academic_years ay ON cv.academic_year_id = ay.id
           WHERE cv.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Clinic visit not found"))?;
    Ok(Json(visit))
}

// ==================== Update ====================

/// Only descriptive fields move after the fact; the medicine reference is
/// immutable because the dispense it produced is already on the ledger.
#[instrument(skip(state, auth, payload))]
pub async fn update_clinic_visit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClinicVisitRequest>,
) -> Result<Json<ClinicVisitResponse>, AppError> {
    let rec = sqlx::query_as::<_, ClinicVisitResponse>(&format!(
        r#"WITH updated AS (
               UPDATE clinic_visits SET
                   malady = COALESCE($1, malady),
                   reason = COALESCE($2, reason),
                   treatment = COALESCE($3, treatment),
                   status = COALESCE($4, status)
               WHERE id = $5
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated cv JOIN academic_years ay ON cv.academic_year_id = ay.id"#
    ))
    .bind(&payload.malady)
    .bind(&payload.reason)
    .bind(&payload.treatment)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Clinic visit not found"))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Updated",
        json!({ "id": rec.id, "school_year": rec.school_year }),
    )
    .await;

    Ok(Json(rec))
}

// ==================== Delete ====================

pub async fn delete_clinic_visit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM clinic_visits WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Clinic visit not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_clinic_visits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM clinic_visits WHERE id = ANY($1)")
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
