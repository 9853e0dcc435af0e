use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeProfileRequest {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub role: String, // teaching, non-teaching, admin
    pub school_year: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<i32>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct EmployeeProfileResponse {
    pub id: i64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub role: String,
    pub status: String,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeMedicalRequest {
    pub employee_id: String,
    pub checkup_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub blood_pressure: Option<String>,
    pub remarks: Option<String>,
    pub school_year: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeMedicalRequest {
    pub checkup_date: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub blood_pressure: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct EmployeeMedicalResponse {
    pub id: i64,
    pub employee_id: String,
    pub checkup_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub blood_pressure: Option<String>,
    pub remarks: Option<String>,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
