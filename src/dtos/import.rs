use serde::Serialize;

/// One failed row from a bulk import, identified by its natural key
/// (LRN, employee id, ...) or row number when no key parsed.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportRowError {
    pub row: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub inserted: usize,
    pub errors: Vec<ImportRowError>,
    pub has_more_errors: bool,
}
