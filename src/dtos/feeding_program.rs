use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateFeedingRecordRequest {
    pub lrn: String,
    pub measurement_type: String, // "PRE" or "POST"
    pub weight_kg: f64,
    pub height_cm: f64,
    pub sbfp_beneficiary: bool,
    pub remarks: Option<String>,
    pub school_year: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeedingRecordRequest {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub sbfp_beneficiary: Option<bool>,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct FeedingRecordResponse {
    pub id: i64,
    pub lrn: String,
    pub measurement_type: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub bmi: f64,
    pub bmi_classification: String,
    pub sbfp_beneficiary: bool,
    pub remarks: Option<String>,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
