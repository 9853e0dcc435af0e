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
use crate::dtos::employee::{
    CreateEmployeeMedicalRequest, CreateEmployeeProfileRequest, EmployeeMedicalResponse,
    EmployeeProfileResponse, UpdateEmployeeMedicalRequest, UpdateEmployeeProfileRequest,
};
use crate::dtos::import::{ImportResponse, ImportRowError};
use crate::error::{map_unique_violation, AppError};
use crate::handlers::academic_year::resolve_academic_year;
use crate::handlers::medical_checkup::compute_bmi;
use crate::handlers::student_profile::error_text;
use crate::import;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const PROFILE_SECTION: &str = "Employee Profile";
const MEDICAL_SECTION: &str = "Employee Medical";
const DUPLICATE_MESSAGE: &str =
    "An employee with this id already exists for the academic year";

const PROFILE_COLUMNS: &str = r#"
    ep.id, ep.employee_id, ep.first_name, ep.last_name, ep.gender,
    ep.birth_date, ep.age, ep.role, ep.status, ay.school_year, ep.created_at"#;

const MEDICAL_COLUMNS: &str = r#"
    em.id, em.employee_id, em.checkup_date, em.height_cm, em.weight_kg,
    em.bmi, em.blood_pressure, em.remarks, ay.school_year, em.created_at"#;

// ==================== Employee profiles ====================

#[instrument(skip(state, auth, payload), fields(employee_id = %payload.employee_id))]
pub async fn create_employee_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateEmployeeProfileRequest>,
) -> Result<(StatusCode, Json<EmployeeProfileResponse>), AppError> {
    if payload.employee_id.trim().is_empty() {
        return Err(AppError::validation("Employee id is required"));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, EmployeeProfileResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO employee_profiles
                   (employee_id, first_name, last_name, gender, birth_date, age,
                    role, status, academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *
           )
           SELECT {PROFILE_COLUMNS}
           FROM inserted ep JOIN academic_years ay ON ep.academic_year_id = ay.id"#
    ))
    .bind(payload.employee_id.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&payload.gender)
    .bind(payload.birth_date)
    .bind(payload.age)
    .bind(&payload.role)
    .bind(payload.status.as_deref().unwrap_or("Active"))
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, DUPLICATE_MESSAGE))?;

    audit::record(
        &state.db_pool,
        &auth,
        PROFILE_SECTION,
        "Created",
        json!({ "employee_id": rec.employee_id, "school_year": rec.school_year }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_employee_profiles(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<EmployeeProfileResponse>>, AppError> {
    let base = format!(
        r#"SELECT {PROFILE_COLUMNS}
           FROM employee_profiles ep
           JOIN academic_years ay ON ep.academic_year_id = ay.id"#
    );
    let employees = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, EmployeeProfileResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY ep.last_name, ep.first_name"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, EmployeeProfileResponse>(&format!(
                "{base} ORDER BY ep.last_name, ep.first_name"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(employees))
}

pub async fn get_employee_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EmployeeProfileResponse>, AppError> {
    let employee = sqlx::query_as::<_, EmployeeProfileResponse>(&format!(
        r#"SELECT {PROFILE_COLUMNS}
           FROM employee_profiles ep
           JOIN academic_years ay ON ep.academic_year_id = ay.id
           WHERE ep.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee profile not found"))?;
    Ok(Json(employee))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_employee_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeeProfileRequest>,
) -> Result<Json<EmployeeProfileResponse>, AppError> {
    let rec = sqlx::query_as::<_, EmployeeProfileResponse>(&format!(
        r#"WITH updated AS (
               UPDATE employee_profiles SET
                   first_name = COALESCE($1, first_name),
                   last_name = COALESCE($2, last_name),
                   gender = COALESCE($3, gender),
                   birth_date = COALESCE($4, birth_date),
                   age = COALESCE($5, age),
                   role = COALESCE($6, role),
                   status = COALESCE($7, status)
               WHERE id = $8
               RETURNING *
           )
           SELECT {PROFILE_COLUMNS}
           FROM updated ep JOIN academic_years ay ON ep.academic_year_id = ay.id"#
    ))
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.gender)
    .bind(payload.birth_date)
    .bind(payload.age)
    .bind(&payload.role)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee profile not found"))?;

    audit::record(
        &state.db_pool,
        &auth,
        PROFILE_SECTION,
        "Updated",
        json!({ "employee_id": rec.employee_id, "school_year": rec.school_year }),
    )
    .await;

    Ok(Json(rec))
}

pub async fn delete_employee_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM employee_profiles WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Employee profile not found"));
    }
    audit::record(&state.db_pool, &auth, PROFILE_SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_employee_profiles(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM employee_profiles WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&state.db_pool)
        .await?;
    audit::record(
        &state.db_pool,
        &auth,
        PROFILE_SECTION,
        "Bulk deleted",
        json!({ "ids": payload.ids, "deleted": result.rows_affected() }),
    )
    .await;
    Ok(Json(BulkDeleteResponse { deleted: result.rows_affected() }))
}

// ==================== Employee profile import ====================

const IMPORT_DICTIONARY: &[(&str, &str)] = &[
    ("Employee ID", "employee_id"),
    ("First Name", "first_name"),
    ("Last Name", "last_name"),
    ("Gender", "gender"),
    ("Birth Date", "birth_date"),
    ("Age", "age"),
    ("Role", "role"),
    ("School Year", "school_year"),
];

fn row_to_request(row: &HashMap<String, String>) -> Result<CreateEmployeeProfileRequest, String> {
    let field = |name: &str| -> Result<String, String> {
        row.get(name).cloned().ok_or_else(|| format!("Missing {name}"))
    };
    let birth_date = NaiveDate::parse_from_str(&field("birth_date")?, "%Y-%m-%d")
        .map_err(|_| "Birth date must be YYYY-MM-DD".to_string())?;
    let age: i32 = import::clean_id(&field("age")?)
        .parse()
        .map_err(|_| "Age must be a number".to_string())?;

    Ok(CreateEmployeeProfileRequest {
        employee_id: import::clean_id(&field("employee_id")?),
        first_name: field("first_name")?,
        last_name: field("last_name")?,
        gender: field("gender")?,
        birth_date,
        age,
        role: field("role")?,
        school_year: field("school_year")?,
        status: None,
    })
}

#[instrument(skip_all)]
pub async fn import_employee_profiles(
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
            .get("employee_id")
            .map(|l| import::clean_id(l))
            .unwrap_or_else(|| format!("row {}", index + 2));

        let outcome = async {
            let req = row_to_request(row).map_err(AppError::validation)?;
            let academic_year_id =
                resolve_academic_year(&state.db_pool, &req.school_year).await?;
            sqlx::query(
                r#"INSERT INTO employee_profiles
                   (employee_id, first_name, last_name, gender, birth_date, age,
                    role, status, academic_year_id)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, 'Active', $8)"#,
            )
            .bind(&req.employee_id)
            .bind(req.first_name.trim())
            .bind(req.last_name.trim())
            .bind(&req.gender)
            .bind(req.birth_date)
            .bind(req.age)
            .bind(&req.role)
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
        PROFILE_SECTION,
        "Imported",
        json!({ "inserted": inserted, "failed": errors.len() }),
    )
    .await;

    let (errors, has_more_errors) = import::truncate_errors(errors);
    Ok(Json(ImportResponse { inserted, errors, has_more_errors }))
}

// ==================== Employee medical records ====================

#[instrument(skip(state, auth, payload), fields(employee_id = %payload.employee_id))]
pub async fn create_employee_medical(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateEmployeeMedicalRequest>,
) -> Result<(StatusCode, Json<EmployeeMedicalResponse>), AppError> {
    let bmi = compute_bmi(payload.weight_kg, payload.height_cm)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    // The employee must exist for the same academic year
    let known = sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
               SELECT 1 FROM employee_profiles
               WHERE employee_id = $1 AND academic_year_id = $2)"#,
    )
    .bind(payload.employee_id.trim())
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await?;
    if !known {
        return Err(AppError::validation(
            "Employee is not enrolled for this academic year",
        ));
    }

    let rec = sqlx::query_as::<_, EmployeeMedicalResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO employee_medicals
                   (employee_id, checkup_date, height_cm, weight_kg, bmi,
                    blood_pressure, remarks, academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *
           )
           SELECT {MEDICAL_COLUMNS}
           FROM inserted em JOIN academic_years ay ON em.academic_year_id = ay.id"#
    ))
    .bind(payload.employee_id.trim())
    .bind(payload.checkup_date)
    .bind(payload.height_cm)
    .bind(payload.weight_kg)
    .bind(bmi)
    .bind(&payload.blood_pressure)
    .bind(&payload.remarks)
    .bind(academic_year_id)
    .fetch_one(&state.db_pool)
    .await?;

    audit::record(
        &state.db_pool,
        &auth,
        MEDICAL_SECTION,
        "Created",
        json!({ "employee_id": rec.employee_id, "school_year": rec.school_year }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(rec)))
}

pub async fn list_employee_medicals(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<EmployeeMedicalResponse>>, AppError> {
    let base = format!(
        r#"SELECT {MEDICAL_COLUMNS}
           FROM employee_medicals em
           JOIN academic_years ay ON em.academic_year_id = ay.id"#
    );
    let records = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, EmployeeMedicalResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY em.checkup_date DESC"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, EmployeeMedicalResponse>(&format!(
                "{base} ORDER BY em.checkup_date DESC"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };
    Ok(Json(records))
}

pub async fn get_employee_medical(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EmployeeMedicalResponse>, AppError> {
    let record = sqlx::query_as::<_, EmployeeMedicalResponse>(&format!(
        r#"SELECT {MEDICAL_COLUMNS}
           FROM employee_medicals em
           JOIN academic_years ay ON em.academic_year_id = ay.id
           WHERE em.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee medical record not found"))?;
    Ok(Json(record))
}

#[instrument(skip(state, auth, payload))]
pub async fn update_employee_medical(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeeMedicalRequest>,
) -> Result<Json<EmployeeMedicalResponse>, AppError> {
    let current = sqlx::query_as::<_, (f64, f64)>(
        "SELECT height_cm, weight_kg FROM employee_medicals WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee medical record not found"))?;

    let height_cm = payload.height_cm.unwrap_or(current.0);
    let weight_kg = payload.weight_kg.unwrap_or(current.1);
    let bmi = compute_bmi(weight_kg, height_cm)?;

    let rec = sqlx::query_as::<_, EmployeeMedicalResponse>(&format!(
        r#"WITH updated AS (
               UPDATE employee_medicals SET
                   checkup_date = COALESCE($1, checkup_date),
                   height_cm = $2,
                   weight_kg = $3,
                   bmi = $4,
                   blood_pressure = COALESCE($5, blood_pressure),
                   remarks = COALESCE($6, remarks)
               WHERE id = $7
               RETURNING *
           )
           SELECT {MEDICAL_COLUMNS}
           FROM updated em JOIN academic_years ay ON em.academic_year_id = ay.id"#
    ))
    .bind(payload.checkup_date)
    .bind(height_cm)
    .bind(weight_kg)
    .bind(bmi)
    .bind(&payload.blood_pressure)
    .bind(&payload.remarks)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee medical record not found"))?;

    audit::record(
        &state.db_pool,
        &auth,
        MEDICAL_SECTION,
        "Updated",
        json!({ "employee_id": rec.employee_id, "school_year": rec.school_year }),
    )
    .await;

    Ok(Json(rec))
}

pub async fn delete_employee_medical(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM employee_medicals WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Employee medical record not found"));
    }
    audit::record(&state.db_pool, &auth, MEDICAL_SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_employee_medicals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM employee_medicals WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(&state.db_pool)
        .await?;
    audit::record(
        &state.db_pool,
        &auth,
        MEDICAL_SECTION,
        "Bulk deleted",
        json!({ "ids": payload.ids, "deleted": result.rows_affected() }),
    )
    .await;
    Ok(Json(BulkDeleteResponse { deleted: result.rows_affected() }))
}
