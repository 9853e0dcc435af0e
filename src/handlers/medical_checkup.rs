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
use crate::dtos::import::{ImportResponse, ImportRowError};
use crate::dtos::medical_checkup::{
    CreateMedicalCheckupRequest, MedicalCheckupResponse, UpdateMedicalCheckupRequest,
};
use crate::error::{map_unique_violation, AppError};
use crate::handlers::academic_year::resolve_academic_year;
use crate::handlers::student_profile::{error_text, validate_lrn};
use crate::import;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Medical Checkup";
const DUPLICATE_MESSAGE: &str = "A checkup already exists for this LRN and academic year";

/// BMI from metric measurements, rounded to one decimal.
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> Result<f64, AppError> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return Err(AppError::validation("Height and weight must be positive"));
    }
    let height_m = height_cm / 100.0;
    Ok((weight_kg / (height_m * height_m) * 10.0).round() / 10.0)
}

/// Nutritional status buckets used across checkups and feeding records.
pub fn classify_bmi(bmi: f64) -> &'static str {
    if bmi < 16.0 {
        "Severely Wasted"
    } else if bmi < 18.5 {
        "Wasted"
    } else if bmi < 25.0 {
        "Normal"
    } else if bmi < 30.0 {
        "Overweight"
    } else {
        "Obese"
    }
}

fn validate_screening(value: &str) -> Result<(), AppError> {
    match value {
        "Passed" | "Failed" => Ok(()),
        _ => Err(AppError::validation("Screening result must be 'Passed' or 'Failed'")),
    }
}

const SELECT_COLUMNS: &str = r#"
    mc.id, mc.lrn, mc.checkup_date, mc.height_cm, mc.weight_kg, mc.bmi,
    mc.bmi_classification, mc.vision_screening, mc.auditory_screening,
    mc.iron_supplementation, mc.dewormed, mc.menarche, mc.remarks,
    ay.school_year, mc.created_at"#;

// ==================== Create ====================

#[instrument(skip(state, auth, payload), fields(lrn = %payload.lrn))]
pub async fn create_medical_checkup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateMedicalCheckupRequest>,
) -> Result<(StatusCode, Json<MedicalCheckupResponse>), AppError> {
    validate_lrn(&payload.lrn)?;
    validate_screening(&payload.vision_screening)?;
    validate_screening(&payload.auditory_screening)?;
    let bmi = compute_bmi(payload.weight_kg, payload.height_cm)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, MedicalCheckupResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO medical_checkups
                   (lrn, checkup_date, height_cm, weight_kg, bmi, bmi_classification,
                    vision_screening, auditory_screening, iron_supplementation,
                    dewormed, menarche, remarks, academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted mc JOIN academic_years ay ON mc.academic_year_id = ay.id"#
    ))
    .bind(&payload.lrn)
    .bind(payload.checkup_date)
    .bind(payload.height_cm)
    .bind(payload.weight_kg)
    .bind(bmi)
    .bind(classify_bmi(bmi))
    .bind(&payload.vision_screening)
    .bind(&payload.auditory_screening)
    .bind(payload.iron_supplementation)
    .bind(payload.dewormed)
    .bind(&payload.menarche)
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
        json!({ "lrn": rec.lrn, "school_year": rec.school_year }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

// ==================== Fetch ====================

pub async fn list_medical_checkups(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<MedicalCheckupResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM medical_checkups mc
           JOIN academic_years ay ON mc.academic_year_id = ay.id"#
    );
    let checkups = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, MedicalCheckupResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY mc.checkup_date DESC"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MedicalCheckupResponse>(&format!(
                "{base} ORDER BY mc.checkup_date DESC"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(checkups))
}

pub async fn get_medical_checkup(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MedicalCheckupResponse>, AppError> {
    let checkup = sqlx::query_as::<_, MedicalCheckupResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM medical_checkups mc
           JOIN academic_years ay ON mc.academic_year_id = ay.id
           WHERE mc.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Medical checkup not found"))?;
    Ok(Json(checkup))
}

// ==================== Update ====================

#[instrument(skip(state, auth, payload))]
pub async fn update_medical_checkup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMedicalCheckupRequest>,
) -> Result<Json<MedicalCheckupResponse>, AppError> {
    if let Some(v) = &payload.vision_screening {
        validate_screening(v)?;
    }
    if let Some(v) = &payload.auditory_screening {
        validate_screening(v)?;
    }

    // Height/weight changes re-derive BMI from the merged measurements
    let current = sqlx::query_as::<_, (f64, f64)>(
        "SELECT height_cm, weight_kg FROM medical_checkups WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Medical checkup not found"))?;

    let height_cm = payload.height_cm.unwrap_or(current.0);
    let weight_kg = payload.weight_kg.unwrap_or(current.1);
    let bmi = compute_bmi(weight_kg, height_cm)?;

    let rec = sqlx::query_as::<_, MedicalCheckupResponse>(&format!(
        r#"WITH updated AS (
               UPDATE medical_checkups SET
                   checkup_date = COALESCE($1, checkup_date),
                   height_cm = $2,
                   weight_kg = $3,
                   bmi = $4,
                   bmi_classification = $5,
                   vision_screening = COALESCE($6, vision_screening),
                   auditory_screening = COALESCE($7, auditory_screening),
                   iron_supplementation = COALESCE($8, iron_supplementation),
                   dewormed = COALESCE($9, dewormed),
                   menarche = COALESCE($10, menarche),
                   remarks = COALESCE($11, remarks)
               WHERE id = $12
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated mc JOIN academic_years ay ON mc.academic_year_id = ay.id"#
    ))
    .bind(payload.checkup_date)
    .bind(height_cm)
    .bind(weight_kg)
    .bind(bmi)
    .bind(classify_bmi(bmi))
    .bind(&payload.vision_screening)
    .bind(&payload.auditory_screening)
    .bind(payload.iron_supplementation)
    .bind(payload.dewormed)
    .bind(&payload.menarche)
    .bind(&payload.remarks)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Medical checkup not found"))?;

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

pub async fn delete_medical_checkup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM medical_checkups WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Medical checkup not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_medical_checkups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM medical_checkups WHERE id = ANY($1)")
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
    ("Checkup Date", "checkup_date"),
    ("Height (cm)", "height_cm"),
    ("Weight (kg)", "weight_kg"),
    ("Vision Screening", "vision_screening"),
    ("Auditory Screening", "auditory_screening"),
    ("Iron Supplementation", "iron_supplementation"),
    ("Dewormed", "dewormed"),
    ("Menarche", "menarche"),
    ("Remarks", "remarks"),
    ("School Year", "school_year"),
];

fn row_to_request(row: &HashMap<String, String>) -> Result<CreateMedicalCheckupRequest, String> {
    let field = |name: &str| -> Result<String, String> {
        row.get(name).cloned().ok_or_else(|| format!("Missing {name}"))
    };
    let checkup_date = NaiveDate::parse_from_str(&field("checkup_date")?, "%Y-%m-%d")
        .map_err(|_| "Checkup date must be YYYY-MM-DD".to_string())?;
    let height_cm: f64 = field("height_cm")?
        .parse()
        .map_err(|_| "Height must be a number".to_string())?;
    let weight_kg: f64 = field("weight_kg")?
        .parse()
        .map_err(|_| "Weight must be a number".to_string())?;
    let iron = import::coerce_bool(&field("iron_supplementation")?)
        .ok_or("Iron supplementation must be yes/no")?;
    let dewormed = import::coerce_bool(&field("dewormed")?).ok_or("Dewormed must be yes/no")?;

    Ok(CreateMedicalCheckupRequest {
        lrn: import::clean_id(&field("lrn")?),
        checkup_date,
        height_cm,
        weight_kg,
        vision_screening: field("vision_screening")?,
        auditory_screening: field("auditory_screening")?,
        iron_supplementation: iron,
        dewormed,
        menarche: row.get("menarche").cloned(),
        remarks: row.get("remarks").cloned(),
        school_year: field("school_year")?,
    })
}

#[instrument(skip_all)]
pub async fn import_medical_checkups(
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
            validate_screening(&req.vision_screening)?;
            validate_screening(&req.auditory_screening)?;
            let bmi = compute_bmi(req.weight_kg, req.height_cm)?;
            let academic_year_id =
                resolve_academic_year(&state.db_pool, &req.school_year).await?;

            sqlx::query(
                r#"INSERT INTO medical_checkups
                   (lrn, checkup_date, height_cm, weight_kg, bmi, bmi_classification,
                    vision_screening, auditory_screening, iron_supplementation,
                    dewormed, menarche, remarks, academic_year_id)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
            )
            .bind(&req.lrn)
            .bind(req.checkup_date)
            .bind(req.height_cm)
            .bind(req.weight_kg)
            .bind(bmi)
            .bind(classify_bmi(bmi))
            .bind(&req.vision_screening)
            .bind(&req.auditory_screening)
            .bind(req.iron_supplementation)
            .bind(req.dewormed)
            .bind(&req.menarche)
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
    fn bmi_rounds_to_one_decimal() {
        // 30 kg at 135 cm: 30 / 1.35^2 = 16.4609... -> 16.5
        assert_eq!(compute_bmi(30.0, 135.0).unwrap(), 16.5);
    }

    #[test]
    fn non_positive_measurements_are_rejected() {
        assert!(compute_bmi(0.0, 135.0).is_err());
        assert!(compute_bmi(30.0, -1.0).is_err());
    }

    #[test]
    fn classification_buckets() {
        assert_eq!(classify_bmi(15.9), "Severely Wasted");
        assert_eq!(classify_bmi(16.0), "Wasted");
        assert_eq!(classify_bmi(18.5), "Normal");
        assert_eq!(classify_bmi(24.9), "Normal");
        assert_eq!(classify_bmi(25.0), "Overweight");
        assert_eq!(classify_bmi(30.0), "Obese");
    }

    #[test]
    fn import_row_coerces_yes_no_columns() {
        let mut row = HashMap::new();
        row.insert("lrn".to_string(), "123456789012".to_string());
        row.insert("checkup_date".to_string(), "2023-08-15".to_string());
        row.insert("height_cm".to_string(), "135".to_string());
        row.insert("weight_kg".to_string(), "30".to_string());
        row.insert("vision_screening".to_string(), "Passed".to_string());
        row.insert("auditory_screening".to_string(), "Passed".to_string());
        row.insert("iron_supplementation".to_string(), "Yes".to_string());
        row.insert("dewormed".to_string(), "No".to_string());
        row.insert("school_year".to_string(), "SY 2023-2024".to_string());

        let req = row_to_request(&row).unwrap();
        assert!(req.iron_supplementation);
        assert!(!req.dewormed);
    }
}
