use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use tracing::instrument;

use crate::audit;
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse, SchoolYearFilter};
use crate::dtos::dengue::{CreateDengueCaseRequest, DengueCaseResponse, UpdateDengueCaseRequest};
use crate::dtos::import::{ImportResponse, ImportRowError};
use crate::error::AppError;
use crate::handlers::academic_year::resolve_academic_year;
use crate::handlers::student_profile::{error_text, validate_lrn};
use crate::import;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Dengue Monitoring";

const SELECT_COLUMNS: &str = r#"
    dc.id, dc.lrn, dc.onset_date, dc.admission_date, dc.discharge_date,
    dc.hospital, dc.remarks, dc.status, ay.school_year, dc.created_at"#;

/// Case dates must be chronological: onset ≤ admission ≤ discharge.
pub fn validate_case_dates(
    onset: NaiveDate,
    admission: Option<NaiveDate>,
    discharge: Option<NaiveDate>,
) -> Result<(), AppError> {
    if let Some(adm) = admission {
        if adm < onset {
            return Err(AppError::validation("Admission date cannot precede onset date"));
        }
    }
    if let Some(dis) = discharge {
        let floor = admission.unwrap_or(onset);
        if dis < floor {
            return Err(AppError::validation(
                "Discharge date cannot precede admission or onset date",
            ));
        }
    }
    Ok(())
}

// ==================== Create ====================

#[instrument(skip(state, auth, payload), fields(lrn = %payload.lrn))]
pub async fn create_dengue_case(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateDengueCaseRequest>,
) -> Result<(StatusCode, Json<DengueCaseResponse>), AppError> {
    validate_lrn(&payload.lrn)?;
    validate_case_dates(payload.onset_date, payload.admission_date, payload.discharge_date)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, DengueCaseResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO dengue_cases
                   (lrn, onset_date, admission_date, discharge_date, hospital,
                    remarks, status, academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, 'Ongoing', $7)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted dc JOIN academic_years ay ON dc.academic_year_id = ay.id"#
    ))
    .bind(&payload.lrn)
    .bind(payload.onset_date)
    .bind(payload.admission_date)
    .bind(payload.discharge_date)
    .bind(&payload.hospital)
    .bind(&payload.remarks)
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({ "lrn": rec.lrn, "school_year": rec.school_year }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

// ==================== Fetch ====================

pub async fn list_dengue_cases(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<DengueCaseResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM dengue_cases dc
           JOIN academic_years ay ON dc.academic_year_id = ay.id"#
    );
    let cases = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, DengueCaseResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY dc.onset_date DESC"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DengueCaseResponse>(&format!(
                "{base} ORDER BY dc.onset_date DESC"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(cases))
}

pub async fn get_dengue_case(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DengueCaseResponse>, AppError> {
    let case = sqlx::query_as::<_, DengueCaseResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM dengue_cases dc
           JOIN academic_years ay ON dc.academic_year_id = ay.id
           WHERE dc.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dengue case not found"))?;
    Ok(Json(case))
}

// ==================== Update ====================

#[instrument(skip(state, auth, payload))]
pub async fn update_dengue_case(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDengueCaseRequest>,
) -> Result<Json<DengueCaseResponse>, AppError> {
    // Merge with stored dates so the ordering check sees the final values
    let current = sqlx::query_as::<_, (NaiveDate, Option<NaiveDate>, Option<NaiveDate>)>(
        "SELECT onset_date, admission_date, discharge_date FROM dengue_cases WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dengue case not found"))?;

    let onset = payload.onset_date.unwrap_or(current.0);
    let admission = payload.admission_date.or(current.1);
    let discharge = payload.discharge_date.or(current.2);
    validate_case_dates(onset, admission, discharge)?;

    let rec = sqlx::query_as::<_, DengueCaseResponse>(&format!(
        r#"WITH updated AS (
               UPDATE dengue_cases SET
                   onset_date = $1,
                   admission_date = $2,
                   discharge_date = $3,
                   hospital = COALESCE($4, hospital),
                   remarks = COALESCE($5, remarks),
                   status = COALESCE($6, status)
               WHERE id = $7
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated dc JOIN academic_years ay ON dc.academic_year_id = ay.id"#
    ))
    .bind(onset)
    .bind(admission)
    .bind(discharge)
    .bind(&payload.hospital)
    .bind(&payload.remarks)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dengue case not found"))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Updated",
        json!({ "lrn": rec.lrn, "school_year": rec.school_year }),
    )
    .await;

    Ok(Json(rec))
}

// ==================== Delete ====================

pub async fn delete_dengue_case(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM dengue_cases WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Dengue case not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_dengue_cases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM dengue_cases WHERE id = ANY($1)")
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

// ==================== Import ====================

const IMPORT_DICTIONARY: &[(&str, &str)] = &[
    ("LRN", "lrn"),
    ("Onset Date", "onset_date"),
    ("Admission Date", "admission_date"),
    ("Discharge Date", "discharge_date"),
    ("Hospital", "hospital"),
    ("Remarks", "remarks"),
    ("School Year", "school_year"),
];

fn row_to_request(row: &HashMap<String, String>) -> Result<CreateDengueCaseRequest, String> {
    let field = |name: &str| -> Result<String, String> {
        row.get(name).cloned().ok_or_else(|| format!("Missing {name}"))
    };
    let parse_date = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| "Dates must be YYYY-MM-DD".to_string())
    };
    let onset_date = parse_date(&field("onset_date")?)?;
    let admission_date = row.get("admission_date").map(|d| parse_date(d)).transpose()?;
    let discharge_date = row.get("discharge_date").map(|d| parse_date(d)).transpose()?;

    Ok(CreateDengueCaseRequest {
        lrn: import::clean_id(&field("lrn")?),
        onset_date,
        admission_date,
        discharge_date,
        hospital: row.get("hospital").cloned(),
        remarks: row.get("remarks").cloned(),
        school_year: field("school_year")?,
    })
}

#[instrument(skip_all)]
pub async fn import_dengue_cases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let bytes = import::read_upload(multipart).await?;
    let rows = import::parse_rows(&bytes, IMPORT_DICTIONARY)?;

    let mut inserted = 0usize;
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_key = row
            .get("lrn")
            .map(|l| import::clean_id(l))
            .unwrap_or_else(|| format!("row {}", index + 2));

        let outcome = async {
            let req = row_to_request(row).map_err(AppError::validation)?;
            validate_lrn(&req.lrn)?;
            validate_case_dates(req.onset_date, req.admission_date, req.discharge_date)?;
            let academic_year_id =
                resolve_academic_year(&state.db_pool, &req.school_year).await?;
            sqlx::query(
                r#"INSERT INTO dengue_cases
                   (lrn, onset_date, admission_date, discharge_date, hospital,
                    remarks, status, academic_year_id)
                   VALUES ($1, $2, $3, $4, $5, $6, 'Ongoing', $7)"#,
            )
            .bind(&req.lrn)
            .bind(req.onset_date)
            .bind(req.admission_date)
            .bind(req.discharge_date)
            .bind(&req.hospital)
            .bind(&req.remarks)
            .bind(academic_year_id)
            .execute(&state.db_pool)
            .await?;
            Ok::<(), AppError>(())
        }
        .await;

        match outcome {
            Ok(()) => inserted += 1,
            Err(e) => errors.push(ImportRowError { row: row_key, message: error_text(e) }),
        }
    }

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Imported",
        json!({ "inserted": inserted, "failed": errors.len() }),
    )
    .await;

    let (errors, has_more_errors) = import::truncate_errors(errors);
    Ok(Json(ImportResponse { inserted, errors, has_more_errors }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn chronological_dates_pass() {
        assert!(validate_case_dates(d("2024-01-01"), Some(d("2024-01-02")), Some(d("2024-01-08"))).is_ok());
        assert!(validate_case_dates(d("2024-01-01"), None, None).is_ok());
        // Discharge without admission checks against onset
        assert!(validate_case_dates(d("2024-01-01"), None, Some(d("2024-01-05"))).is_ok());
    }

    #[test]
    fn out_of_order_dates_fail() {
        assert!(validate_case_dates(d("2024-01-05"), Some(d("2024-01-02")), None).is_err());
        assert!(validate_case_dates(d("2024-01-01"), Some(d("2024-01-03")), Some(d("2024-01-02"))).is_err());
        assert!(validate_case_dates(d("2024-01-05"), None, Some(d("2024-01-02"))).is_err());
    }
}
