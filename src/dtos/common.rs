use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// Optional school-year label filter shared by every list endpoint.
#[derive(Debug, Deserialize)]
pub struct SchoolYearFilter {
    pub school_year: Option<String>,
}
