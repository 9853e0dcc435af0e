use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct CreateDengueCaseRequest {
    pub lrn: String,
    pub onset_date: NaiveDate,
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub hospital: Option<String>,
    pub remarks: Option<String>,
    pub school_year: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDengueCaseRequest {
    pub onset_date: Option<NaiveDate>,
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub hospital: Option<String>,
    pub remarks: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DengueCaseResponse {
    pub id: i64,
    pub lrn: String,
    pub onset_date: NaiveDate,
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub hospital: Option<String>,
    pub remarks: Option<String>,
    pub status: String,
    pub school_year: String,
    pub created_at: Option<DateTime<Utc>>,
}
