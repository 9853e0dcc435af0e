use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateClinicVisitRequest {
    pub patient_name: String,
    pub patient_type: String, // "Student" or "Employee"
    pub lrn: Option<String>,
    pub grade: Option<String>,
    pub visit_date: NaiveDate,
    pub malady: String,
    pub reason: Option<String>,
    pub treatment: Option<String>,
    pub school_year: String,
    // Optional medicine reference; triggers the stock availability check
    pub item_id: Option<String>,
    pub batch_id: Option<String>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClinicVisitRequest {
    pub malady: Option<String>,
    pub reason: Option<String>,
    pub treatment: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ClinicVisitResponse {
    pub id: i64,
    pub patient_name: String,
    pub patient_type: String,
    pub lrn: Option<String>,
    pub grade: Option<String>,
    pub visit_date: NaiveDate,
    pub malady: String,
    pub reason: Option<String>,
    pub treatment: Option<String>,
    pub item_id: Option<String>,
    pub batch_id: Option<String>,
    pub quantity: Option<i32>,
    pub status: String,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
