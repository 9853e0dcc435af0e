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
use crate::dtos::student_profile::{
    CreateStudentProfileRequest, StudentProfileResponse, UpdateStudentProfileRequest,
};
use crate::error::{map_unique_violation, AppError};
use crate::handlers::academic_year::resolve_academic_year;
use crate::import;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const SECTION: &str = "Student Profile";
const DUPLICATE_MESSAGE: &str = "A student with this LRN already exists for the academic year";

/// Learner reference numbers are exactly 12 digits.
pub fn validate_lrn(lrn: &str) -> Result<(), AppError> {
    if lrn.len() == 12 && lrn.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::validation("LRN must be exactly 12 digits"))
    }
}

const SELECT_COLUMNS: &str = r#"
    sp.id, sp.lrn, sp.first_name, sp.last_name, sp.middle_name, sp.gender,
    sp.birth_date, sp.age, sp.grade, sp.section, sp.address,
    sp.parent_name, sp.parent_contact, sp.status,
    ay.school_year, sp.created_at"#;

// ==================== Create ====================

#[instrument(skip(state, auth, payload), fields(lrn = %payload.lrn))]
pub async fn create_student_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateStudentProfileRequest>,
) -> Result<(StatusCode, Json<StudentProfileResponse>), AppError> {
    validate_lrn(&payload.lrn)?;
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    let academic_year_id = resolve_academic_year(&state.db_pool, &payload.school_year).await?;

    let rec = sqlx::query_as::<_, StudentProfileResponse>(&format!(
        r#"WITH inserted AS (
               INSERT INTO student_profiles
                   (lrn, first_name, last_name, middle_name, gender, birth_date, age,
                    grade, section, address, parent_name, parent_contact, status,
                    academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM inserted sp JOIN academic_years ay ON sp.academic_year_id = ay.id"#
    ))
    .bind(&payload.lrn)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&payload.middle_name)
    .bind(&payload.gender)
    .bind(payload.birth_date)
    .bind(payload.age)
    .bind(&payload.grade)
    .bind(&payload.section)
    .bind(&payload.address)
    .bind(&payload.parent_name)
    .bind(&payload.parent_contact)
    .bind(payload.status.as_deref().unwrap_or("Active"))
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

pub async fn list_student_profiles(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<StudentProfileResponse>>, AppError> {
    let base = format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM student_profiles sp
           JOIN academic_years ay ON sp.academic_year_id = ay.id"#
    );

    let students = match filter.school_year {
        Some(label) => {
            sqlx::query_as::<_, StudentProfileResponse>(&format!(
                "{base} WHERE ay.school_year = $1 ORDER BY sp.last_name, sp.first_name"
            ))
            .bind(label.trim())
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, StudentProfileResponse>(&format!(
                "{base} ORDER BY sp.last_name, sp.first_name"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };

    Ok(Json(students))
}

pub async fn get_student_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StudentProfileResponse>, AppError> {
    let student = sqlx::query_as::<_, StudentProfileResponse>(&format!(
        r#"SELECT {SELECT_COLUMNS}
           FROM student_profiles sp
           JOIN academic_years ay ON sp.academic_year_id = ay.id
           WHERE sp.id = $1"#
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Student profile not found"))?;
    Ok(Json(student))
}

// ==================== Update ====================

#[instrument(skip(state, auth, payload))]
pub async fn update_student_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentProfileRequest>,
) -> Result<Json<StudentProfileResponse>, AppError> {
    let rec = sqlx::query_as::<_, StudentProfileResponse>(&format!(
        r#"WITH updated AS (
               UPDATE student_profiles SET
                   first_name = COALESCE($1, first_name),
                   last_name = COALESCE($2, last_name),
                   middle_name = COALESCE($3, middle_name),
                   gender = COALESCE($4, gender),
                   birth_date = COALESCE($5, birth_date),
                   age = COALESCE($6, age),
                   grade = COALESCE($7, grade),
                   section = COALESCE($8, section),
                   address = COALESCE($9, address),
                   parent_name = COALESCE($10, parent_name),
                   parent_contact = COALESCE($11, parent_contact),
                   status = COALESCE($12, status)
               WHERE id = $13
               RETURNING *
           )
           SELECT {SELECT_COLUMNS}
           FROM updated sp JOIN academic_years ay ON sp.academic_year_id = ay.id"#
    ))
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.middle_name)
    .bind(&payload.gender)
    .bind(payload.birth_date)
    .bind(payload.age)
    .bind(&payload.grade)
    .bind(&payload.section)
    .bind(&payload.address)
    .bind(&payload.parent_name)
    .bind(&payload.parent_contact)
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Student profile not found"))?;

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

pub async fn delete_student_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM student_profiles WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Student profile not found"));
    }
    audit::record(&state.db_pool, &auth, SECTION, "Deleted", json!({ "id": id })).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_student_profiles(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("No ids provided"));
    }
    let result = sqlx::query("DELETE FROM student_profiles WHERE id = ANY($1)")
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
    ("First Name", "first_name"),
    ("Last Name", "last_name"),
    ("Middle Name", "middle_name"),
    ("Gender", "gender"),
    ("Birth Date", "birth_date"),
    ("Age", "age"),
    ("Grade", "grade"),
    ("Section", "section"),
    ("Address", "address"),
    ("Parent Name", "parent_name"),
    ("Parent Contact", "parent_contact"),
    ("School Year", "school_year"),
];

fn row_to_request(row: &HashMap<String, String>) -> Result<CreateStudentProfileRequest, String> {
    let field = |name: &str| -> Result<String, String> {
        row.get(name).cloned().ok_or_else(|| format!("Missing {name}"))
    };
    let birth_date = NaiveDate::parse_from_str(&field("birth_date")?, "%Y-%m-%d")
        .map_err(|_| "Birth date must be YYYY-MM-DD".to_string())?;
    let age: i32 = import::clean_id(&field("age")?)
        .parse()
        .map_err(|_| "Age must be a number".to_string())?;

    Ok(CreateStudentProfileRequest {
        lrn: import::clean_id(&field("lrn")?),
        first_name: field("first_name")?,
        last_name: field("last_name")?,
        middle_name: row.get("middle_name").cloned(),
        gender: field("gender")?,
        birth_date,
        age,
        grade: field("grade")?,
        section: field("section")?,
        address: row.get("address").cloned(),
        parent_name: row.get("parent_name").cloned(),
        parent_contact: row.get("parent_contact").cloned(),
        school_year: field("school_year")?,
        status: None,
    })
}

/// Rows are processed independently: a failed row is collected into the
/// error list and does not roll back rows already inserted in this call.
#[instrument(skip_all)]
pub async fn import_student_profiles(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let bytes = import::read_upload(multipart).await?;
    let rows = import::parse_rows(&bytes, IMPORT_DICTIONARY)?;

    let mut year_cache: HashMap<String, i64> = HashMap::new();
    let mut inserted = 0usize;
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_key = row
            .get("lrn")
            .map(|l| import::clean_id(l))
            .unwrap_or_else(|| format!("row {}", index + 2));

        let req = match row_to_request(row) {
            Ok(req) => req,
            Err(message) => {
                errors.push(ImportRowError { row: row_key, message });
                continue;
            }
        };
        if let Err(e) = validate_lrn(&req.lrn) {
            errors.push(ImportRowError { row: row_key, message: error_text(e) });
            continue;
        }

        let academic_year_id = match year_cache.get(req.school_year.trim()) {
            Some(id) => *id,
            None => match resolve_academic_year(&state.db_pool, &req.school_year).await {
                Ok(id) => {
                    year_cache.insert(req.school_year.trim().to_string(), id);
                    id
                }
                Err(e) => {
                    errors.push(ImportRowError { row: row_key, message: error_text(e) });
                    continue;
                }
            },
        };

        let insert = sqlx::query(
            r#"INSERT INTO student_profiles
               (lrn, first_name, last_name, middle_name, gender, birth_date, age,
                grade, section, address, parent_name, parent_contact, status,
                academic_year_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'Active', $13)"#,
        )
        .bind(&req.lrn)
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(&req.middle_name)
        .bind(&req.gender)
        .bind(req.birth_date)
        .bind(req.age)
        .bind(&req.grade)
        .bind(&req.section)
        .bind(&req.address)
        .bind(&req.parent_name)
        .bind(&req.parent_contact)
        .bind(academic_year_id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| map_unique_violation(e, DUPLICATE_MESSAGE));

        match insert {
            Ok(_) => inserted += 1,
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

pub(crate) fn error_text(err: AppError) -> String {
    match err {
        AppError::ValidationError(msg)
        | AppError::Conflict(msg)
        | AppError::NotFound(msg)
        | AppError::Forbidden(msg)
        | AppError::Unauthorized(msg)
        | AppError::Internal(msg) => msg,
        AppError::DatabaseError(e) => format!("Database error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lrn_must_be_twelve_digits() {
        assert!(validate_lrn("123456789012").is_ok());
        assert!(validate_lrn("12345678901").is_err());
        assert!(validate_lrn("1234567890123").is_err());
        assert!(validate_lrn("12345678901a").is_err());
    }

    #[test]
    fn import_row_maps_and_coerces() {
        let mut row = HashMap::new();
        row.insert("lrn".to_string(), "123456789012.0".to_string());
        row.insert("first_name".to_string(), "Ana".to_string());
        row.insert("last_name".to_string(), "Reyes".to_string());
        row.insert("gender".to_string(), "Female".to_string());
        row.insert("birth_date".to_string(), "2015-06-01".to_string());
        row.insert("age".to_string(), "9".to_string());
        row.insert("grade".to_string(), "Grade 4".to_string());
        row.insert("section".to_string(), "Sampaguita".to_string());
        row.insert("school_year".to_string(), "SY 2023-2024".to_string());

        let req = row_to_request(&row).unwrap();
        assert_eq!(req.lrn, "123456789012");
        assert_eq!(req.age, 9);
        assert!(req.middle_name.is_none());
    }

    #[test]
    fn import_row_missing_required_field_errors() {
        let mut row = HashMap::new();
        row.insert("lrn".to_string(), "123456789012".to_string());
        let err = row_to_request(&row).unwrap_err();
        assert!(err.starts_with("Missing "));
    }
}
