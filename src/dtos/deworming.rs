use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateDewormingReportRequest {
    pub grade: String,
    pub enrolled: i32,
    pub dewormed_male: i32,
    pub dewormed_female: i32,
    pub school_year: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDewormingReportRequest {
    pub enrolled: Option<i32>,
    pub dewormed_male: Option<i32>,
    pub dewormed_female: Option<i32>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DewormingReportResponse {
    pub id: i64,
    pub grade: String,
    pub enrolled: i32,
    pub dewormed_male: i32,
    pub dewormed_female: i32,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
