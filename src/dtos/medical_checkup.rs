use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateMedicalCheckupRequest {
    pub lrn: String,
    pub checkup_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub vision_screening: String,   // "Passed" / "Failed"
    pub auditory_screening: String, // "Passed" / "Failed"
    pub iron_supplementation: bool,
    pub dewormed: bool,
    pub menarche: Option<String>,
    pub remarks: Option<String>,
    pub school_year: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMedicalCheckupRequest {
    pub checkup_date: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub vision_screening: Option<String>,
    pub auditory_screening: Option<String>,
    pub iron_supplementation: Option<bool>,
    pub dewormed: Option<bool>,
    pub menarche: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct MedicalCheckupResponse {
    pub id: i64,
    pub lrn: String,
    pub checkup_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub bmi_classification: String,
    pub vision_screening: String,
    pub auditory_screening: String,
    pub iron_supplementation: bool,
    pub dewormed: bool,
    pub menarche: Option<String>,
    pub remarks: Option<String>,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
