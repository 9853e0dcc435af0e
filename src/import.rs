// src/import.rs
//
// Bulk spreadsheet import plumbing shared by the domain import endpoints.
// The uploaded file is a CSV with a header row; headers are mapped through a
// per-domain dictionary to field names, cells are coerced (trimmed ids,
// "yes"/"no" booleans), and each row is inserted independently. Row failures
// are accumulated, truncated to the first five in the response.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::dtos::import::ImportRowError;
use crate::error::AppError;

pub const MAX_REPORTED_ERRORS: usize = 5;

/// Pulls the first file field out of a multipart upload.
pub async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")));
        }
    }
    Err(AppError::validation("No file found in upload"))
}

/// Parses CSV bytes into rows of field→cell maps. `dictionary` maps the
/// sheet's human header text to internal field names; unrecognized columns
/// are ignored so extra spreadsheet columns do not break imports.
pub fn parse_rows(
    bytes: &[u8],
    dictionary: &[(&str, &str)],
) -> Result<Vec<HashMap<String, String>>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::validation(format!("Unreadable header row: {e}")))?
        .clone();

    // Column index -> internal field name
    let mut columns: Vec<Option<&str>> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let field = dictionary
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(header.trim()))
            .map(|(_, field)| *field);
        columns.push(field);
    }

    if columns.iter().all(Option::is_none) {
        return Err(AppError::validation(
            "No recognized columns in header row",
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::validation(format!("Unreadable row: {e}")))?;
        let mut row = HashMap::new();
        for (idx, cell) in record.iter().enumerate() {
            if let Some(Some(field)) = columns.get(idx) {
                if !cell.is_empty() {
                    row.insert(field.to_string(), cell.to_string());
                }
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Spreadsheet cells frequently carry numeric ids as "123456789012.0";
/// strip the float tail and surrounding whitespace.
pub fn clean_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(head) if head.bytes().all(|b| b.is_ascii_digit()) => head.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Boolean columns arrive as "yes"/"no" (case-insensitive); also accepts
/// true/false and 1/0 for re-imported exports.
pub fn coerce_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Truncates the accumulated row errors to the reporting cap, flagging
/// whether more were suppressed.
pub fn truncate_errors(mut errors: Vec<ImportRowError>) -> (Vec<ImportRowError>, bool) {
    let has_more = errors.len() > MAX_REPORTED_ERRORS;
    errors.truncate(MAX_REPORTED_ERRORS);
    (errors, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &[(&str, &str)] = &[
        ("LRN", "lrn"),
        ("First Name", "first_name"),
        ("SBFP Beneficiary", "sbfp_beneficiary"),
    ];

    #[test]
    fn headers_map_case_insensitively_and_extras_are_ignored() {
        let csv = b"lrn,first name,Favorite Color,SBFP Beneficiary\n101,Ana,blue,Yes\n";
        let rows = parse_rows(csv, DICT).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["lrn"], "101");
        assert_eq!(rows[0]["first_name"], "Ana");
        assert_eq!(rows[0]["sbfp_beneficiary"], "Yes");
        assert!(!rows[0].contains_key("Favorite Color"));
    }

    #[test]
    fn empty_cells_are_omitted_and_blank_rows_dropped() {
        let csv = b"LRN,First Name\n101,\n,\n102,Ben\n";
        let rows = parse_rows(csv, DICT).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("first_name"));
        assert_eq!(rows[1]["first_name"], "Ben");
    }

    #[test]
    fn unrecognized_header_row_is_rejected() {
        let csv = b"Foo,Bar\n1,2\n";
        assert!(parse_rows(csv, DICT).is_err());
    }

    #[test]
    fn clean_id_strips_float_tails() {
        assert_eq!(clean_id("123456789012.0"), "123456789012");
        assert_eq!(clean_id("  EMP-42  "), "EMP-42");
        // A non-numeric head keeps its suffix
        assert_eq!(clean_id("v1.0"), "v1.0");
    }

    #[test]
    fn yes_no_booleans_coerce() {
        assert_eq!(coerce_bool("Yes"), Some(true));
        assert_eq!(coerce_bool(" no "), Some(false));
        assert_eq!(coerce_bool("TRUE"), Some(true));
        assert_eq!(coerce_bool("0"), Some(false));
        assert_eq!(coerce_bool("maybe"), None);
    }

    #[test]
    fn errors_truncate_to_five_with_flag() {
        let errors: Vec<ImportRowError> = (0..8)
            .map(|i| ImportRowError {
                row: format!("row-{i}"),
                message: "bad".to_string(),
            })
            .collect();
        let (kept, has_more) = truncate_errors(errors);
        assert_eq!(kept.len(), 5);
        assert!(has_more);
        assert_eq!(kept[0].row, "row-0");

        let (kept, has_more) = truncate_errors(vec![]);
        assert!(kept.is_empty());
        assert!(!has_more);
    }
}
