use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateAcademicYearRequest {
    pub school_year: String, // "SY 2023-2024"
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAcademicYearRequest {
    pub status: String, // "Active", "Completed", "Planned"
}

#[derive(Debug, Serialize, FromRow)]
pub struct AcademicYearResponse {
    pub id: i64,
    pub school_year: String,
    pub start_year: i32,
    pub end_year: i32,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}
