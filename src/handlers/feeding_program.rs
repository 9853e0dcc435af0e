use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::instrument;

use crate::audit;
use crate::dtos::common::{BulkDeleteRequest, BulkDeleteResponse, SchoolYearFilter};
use crate::dtos::feeding_program::{
    CreateFeedingRecordRequest, FeedingRecordResponse, UpdateFeedingRecordRequest,
};
use crate::dtos::import::{ImportResponse, ImportRowError};
use crate::error::{map_unique_violation, AppError};
use crate::handlers::academic_year::resolve_academic_year;
use crate::handlers::medical_checkup::{classify_bmi, compute_bmi};
use crate::handlers::student_profile::{error_text, validate_lrn};
use crate::import;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Feeding Program";
const DUPLICATE_MESSAGE: &str =
    "A weighing of this type already exists for this LRN and academic year";

fn validate_measurement_type(value: &str) -> Result<(), AppError> {
    match value {
        "PRE" | "POST" => Ok(()),
        _ => Err(AppError::validation("Measurement type must be 'PRE' or 'POST'")),
    }
}

const SELECT_COLUMNS: &str = r#"
    fr.id, fr.lrn, fr.measurement_type, fr.weight_kg, fr.height_cm, fr.bmi,
    fr.bmi_classification, fr.sbfp_beneficiary, fr.remarks,
    ay.school_year, fr.created_at"#;

// ==================== Create ====================

#[instrument(skip(state, auth, payload), fields(lrn = %payload.lrn))]
pub async fn create_feeding_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateFeedingRecordRequest>,
) -> Result<(StatusCode, Json<FeedingRecordResponse>), AppError> {
    validate_lrn(&payload.lrn)?;
    validate_measurement_type(&payload.measurement_type)?;
    let bmi = compute_bmi(payload.weight_kg, payload.height_cm)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, FeedingRecordResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO feeding_records
                   (lrn, measurement_type, weight_kg, height_cm, bmi,
                    bmi_classification, sbfp_beneficiary, remarks, academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted fr JOIN academic_years ay ON fr.academic_year_id = ay.id"#
    ))
    .bind(&payload.lrn)
    .bind(&payload.measurement_type)
    .bind(payload.weight_kg)
    .bind(payload.height_cm)
    .bind(bmi)
    .bind(classify_bmi(bmi))
    .bind(payload.sbfp_beneficiary)
    .bind(&payload.remarks)
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, DUPLICATE_MESSAGE))?;

    audit::record(
        &state.db_pool,
        &auth,
        SECTION,
        "Created",
        json!({
            "lrn": rec.lrn,
            "measurement_type": rec.measurement_type,
            "school_year": rec.school_year
        }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

// ==================== Fetch ====================

pub async fn list_feeding_records(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<FeedingRecordResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM feeding_records fr
           JOIN academic_years ay ON fr.academic_year_id = ay.id"#
    );
    let records = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, FeedingRecordResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY fr.lrn, fr.measurement_type"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, FeedingRecordResponse>(&format!(
                "{base} ORDER BY fr.lrn, fr.measurement_type"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(records))
}

pub async fn get_feeding_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FeedingRecordResponse>, AppError> {
    let record = sqlx::query_as::<_, FeedingRecordResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM feeding_records fr
           JOIN academic_years ay ON fr.academic_year_id = ay.id
           WHERE fr.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Feeding record not found"))?;
    Ok(Json(record))
}

// ==================== Update ====================

#[instrument(skip(state, auth, payload))]
pub async fn update_feeding_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFeedingRecordRequest>,
) -> Result<Json<FeedingRecordResponse>, AppError> {
    let current = sqlx::query_as::<_, (f64, f64)>(
        "SELECT height_cm, weight_kg FROM feeding_records WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Feeding record not found"))?;

    let height_cm = payload.height_cm.unwrap_or(current.0);
    let weight_kg = payload.weight_kg.unwrap_or(current.1);
    let bmi = compute_bmi(weight_kg, height_cm)?;

    let rec = sqlx::query_as::<_, FeedingRecordResponse>(&format!(
        r#"WITH updated AS (
               UPDATE feeding_records SET
                   weight_kg = $1,
                   height_cm = $2,
                   bmi = $3,
                   bmi_classification = $4,
                   sbfp_beneficiary = COALESCE($5, sbfp_beneficiary),
                   remarks = COALESCE($6, remarks)
               WHERE id = $7
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated fr JOIN academic_years ay ON fr.academic_year_id = ay.id"#
    ))
    .bind(weight_kg)
    .bind(height_cm)
    .bind(bmi)
    .bind(classify_bmi(bmi))
    .bind(payload.sbfp_beneficiary)
    .bind(&payload.remarks)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Feeding record not found"))?;

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

pub async fn delete_feeding_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM feeding_records WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Feeding record not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_feeding_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM feeding_records WHERE id = ANY($1)")
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
    ("Measurement Type", "measurement_type"),
    ("Weight (kg)", "weight_kg"),
    ("Height (cm)", "height_cm"),
    ("SBFP Beneficiary", "sbfp_beneficiary"),
    ("Remarks", "remarks"),
    ("School Year", "school_year"),
];

fn row_to_request(row: &HashMap<String, String>) -> Result<CreateFeedingRecordRequest, String> {
    let field = |name: &str| -> Result<String, String> {
        row.get(name).cloned().ok_or_else(|| format!("Missing {name}"))
    };
    let weight_kg: f64 = field("weight_kg")?
        .parse()
        .map_err(|_| "Weight must be a number".to_string())?;
    let height_cm: f64 = field("height_cm")?
        .parse()
        .map_err(|_| "Height must be a number".to_string())?;
    let sbfp = import::coerce_bool(&field("sbfp_beneficiary")?)
        .ok_or("SBFP Beneficiary must be yes/no")?;

    Ok(CreateFeedingRecordRequest {
        lrn: import::clean_id(&field("lrn")?),
        measurement_type: field("measurement_type")?.to_uppercase(),
        weight_kg,
        height_cm,
        sbfp_beneficiary: sbfp,
        remarks: row.get("remarks").cloned(),
        school_year: field("school_year")?,
    })
}

#[instrument(skip_all)]
pub async fn import_feeding_records(
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
            validate_measurement_type(&req.measurement_type)?;
            let bmi = compute_bmi(req.weight_kg, req.height_cm)?;
            let academic_year_id =
                resolve_academic_year(&state.db_pool, &req.school_year).await?;
            sqlx::query(
                r#"INSERT INTO feeding_records
                   (lrn, measurement_type, weight_kg, height_cm, bmi,
                    bmi_classification, sbfp_beneficiary, remarks, academic_year_id)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
            )
            .bind(&req.lrn)
            .bind(&req.measurement_type)
            .bind(req.weight_kg)
            .bind(req.height_cm)
            .bind(bmi)
            .bind(classify_bmi(bmi))
            .bind(req.sbfp_beneficiary)
            .bind(&req.remarks)
            .bind(academic_year_id)
            .execute(&state.db_pool)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_MESSAGE))?;
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

    #[test]
    fn measurement_type_is_pre_or_post() {
        assert!(validate_measurement_type("PRE").is_ok());
        assert!(validate_measurement_type("POST").is_ok());
        assert!(validate_measurement_type("MID").is_err());
        assert!(validate_measurement_type("pre").is_err());
    }

    #[test]
    fn import_row_uppercases_measurement_type() {
        let mut row = HashMap::new();
        row.insert("lrn".to_string(), "123456789012".to_string());
        row.insert("measurement_type".to_string(), "pre".to_string());
        row.insert("weight_kg".to_string(), "28.5".to_string());
        row.insert("height_cm".to_string(), "130".to_string());
        row.insert("sbfp_beneficiary".to_string(), "Yes".to_string());
        row.insert("school_year".to_string(), "SY 2023-2024".to_string());

        let req = row_to_request(&row).unwrap();
        assert_eq!(req.measurement_type, "PRE");
        assert!(req.sbfp_beneficiary);
    }
}
