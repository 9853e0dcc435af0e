use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateStudentProfileRequest {
    pub lrn: String, // 12-digit learner reference number
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub grade: String,
    pub section: String,
    pub address: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub school_year: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<i32>,
    pub grade: Option<String>,
    pub section: Option<String>,
    pub address: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct StudentProfileResponse {
    pub id: i64,
    pub lrn: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub grade: String,
    pub section: String,
    pub address: Option<String>,
    pub parent_name: Option<String>,
    pub parent_contact: Option<String>,
    pub status: String,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
