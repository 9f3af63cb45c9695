//! Required-column contract, checked before any row content is looked at.

use ingest_common::model::csv::ColumnValidationError;
use std::collections::HashMap;

pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "amount", "category"];
pub const OPTIONAL_COLUMNS: [&str; 2] = ["label", "parent_category"];

/// Comparison key for header names: surrounding whitespace and case are
/// ignored everywhere a header is matched.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<ColumnValidationError>,
}

/// One error per missing required column. Extra columns are always allowed.
pub fn validate_headers(headers: &[String]) -> ValidationOutcome {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let found = headers.join(", ");

    let errors: Vec<ColumnValidationError> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !normalized.iter().any(|h| h == *required))
        .map(|required| ColumnValidationError {
            column: required.to_string(),
            message: format!(
                "We expected a column named '{}'. Your file has columns: {}",
                required, found
            ),
            row: None,
        })
        .collect();

    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
    }
}

/// Maps each known column name to the header token used as the row key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    columns: HashMap<&'static str, String>,
}

impl HeaderMap {
    /// When a known column appears more than once, the last occurrence wins,
    /// matching how rows are keyed.
    pub fn build(raw_headers: &[String]) -> Self {
        let mut columns = HashMap::new();
        for raw in raw_headers {
            let normalized = normalize_header(raw);
            if let Some(known) = REQUIRED_COLUMNS
                .iter()
                .chain(OPTIONAL_COLUMNS.iter())
                .find(|c| **c == normalized)
            {
                columns.insert(*known, raw.clone());
            }
        }
        HeaderMap { columns }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }
}
