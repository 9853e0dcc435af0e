use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
pub struct MonthlyCount {
    pub month: i32,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct GradeGenderCount {
    pub grade: String,
    pub gender: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct FeedingOutcomeReport {
    pub school_year: String,
    pub pre: Vec<LabelCount>,
    pub post: Vec<LabelCount>,
}

#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    pub current: String,  // school-year label
    pub previous: String, // school-year label
}

#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    pub current_school_year: String,
    pub previous_school_year: String,
    pub current_total: i64,
    pub previous_total: i64,
    pub summary: String,
}
