//! Per-field checks over a bounded sample and the accept/reject decision.
//!
//! Only the first `sample_size` rows are inspected, so cost stays flat as
//! files grow. Rows after the sample are accepted as-is. When the share of
//! failing sampled rows is strictly above the threshold the file is treated as
//! the wrong shape altogether and nothing is accepted.

use super::headers::HeaderMap;
use super::values::{exceeds_text_limit, is_valid_amount, is_valid_date, MAX_TEXT_CHARS};
use ingest_common::model::csv::{ColumnValidationError, RawRow};
use std::collections::HashSet;

/// Number of skipped row numbers quoted in the aggregated warning.
const SKIPPED_PREVIEW_LEN: usize = 5;

/// An accepted row together with its 1-based, header-inclusive line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedRow {
    pub row_number: usize,
    pub values: RawRow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowValidation {
    pub accepted: Vec<NumberedRow>,
    pub errors: Vec<ColumnValidationError>,
    /// Header-inclusive numbers of the sampled rows that failed.
    pub skipped_rows: Vec<usize>,
    pub sample_size: usize,
    /// Set when the failure rate crossed the threshold; `accepted` is empty.
    pub rejected: bool,
    pub warning: Option<String>,
}

impl RowValidation {
    pub fn fail_rate(&self) -> f64 {
        if self.sample_size == 0 {
            0.0
        } else {
            self.skipped_rows.len() as f64 / self.sample_size as f64
        }
    }
}

/// Text columns whose stored length is capped.
pub const LIMITED_COLUMNS: [&str; 3] = ["category", "label", "parent_category"];

pub fn too_long(row_num: usize, column: &str) -> ColumnValidationError {
    ColumnValidationError {
        column: column.to_string(),
        message: format!(
            "Row {}: The value in '{}' is longer than {} characters. Shorten it and try again.",
            row_num, column, MAX_TEXT_CHARS
        ),
        row: Some(row_num),
    }
}

/// Data row `index` (0-based) sits on line `index + 2` of the file.
pub fn row_number(index: usize) -> usize {
    index + 2
}

pub fn validate_rows(
    rows: Vec<RawRow>,
    header_map: &HeaderMap,
    sample_size: usize,
    max_fail_rate: f64,
) -> RowValidation {
    let sample_len = rows.len().min(sample_size);
    let mut errors = Vec::new();
    let mut skipped = HashSet::new();
    let mut skipped_rows = Vec::new();

    for (index, row) in rows.iter().take(sample_len).enumerate() {
        let row_errors = check_row(row, header_map, row_number(index));
        if !row_errors.is_empty() {
            skipped.insert(index);
            skipped_rows.push(row_number(index));
            errors.extend(row_errors);
        }
    }

    let mut outcome = RowValidation {
        accepted: Vec::new(),
        errors,
        skipped_rows,
        sample_size: sample_len,
        rejected: false,
        warning: None,
    };

    if outcome.fail_rate() > max_fail_rate {
        outcome.rejected = true;
        return outcome;
    }

    if !outcome.skipped_rows.is_empty() {
        outcome.warning = Some(skipped_warning(&outcome.skipped_rows));
    }

    outcome.accepted = rows
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !skipped.contains(index))
        .map(|(index, values)| NumberedRow {
            row_number: row_number(index),
            values,
        })
        .collect();

    outcome
}

fn field<'a>(row: &'a RawRow, header_map: &HeaderMap, column: &str) -> &'a str {
    header_map
        .get(column)
        .and_then(|key| row.get(key))
        .map(String::as_str)
        .unwrap_or("")
}

fn check_row(row: &RawRow, header_map: &HeaderMap, row_num: usize) -> Vec<ColumnValidationError> {
    let mut errors = Vec::new();

    let date = field(row, header_map, "date");
    if !is_valid_date(date) {
        errors.push(ColumnValidationError {
            column: "date".to_string(),
            message: format!(
                "Row {}: We couldn't read '{}' as a date. Expected format: YYYY-MM-DD (e.g., 2025-01-15)",
                row_num, date
            ),
            row: Some(row_num),
        });
    }

    let amount = field(row, header_map, "amount");
    if !is_valid_amount(amount) {
        errors.push(ColumnValidationError {
            column: "amount".to_string(),
            message: format!(
                "Row {}: We couldn't read '{}' as an amount. Expected a number (e.g., 1200.00)",
                row_num, amount
            ),
            row: Some(row_num),
        });
    }

    if field(row, header_map, "category").trim().is_empty() {
        errors.push(ColumnValidationError {
            column: "category".to_string(),
            message: format!(
                "Row {}: Category is empty. Every row needs a category value.",
                row_num
            ),
            row: Some(row_num),
        });
    }

    for column in LIMITED_COLUMNS {
        if exceeds_text_limit(field(row, header_map, column)) {
            errors.push(too_long(row_num, column));
        }
    }

    errors
}

fn skipped_warning(skipped_rows: &[usize]) -> String {
    let preview: Vec<String> = skipped_rows
        .iter()
        .take(SKIPPED_PREVIEW_LEN)
        .map(|n| n.to_string())
        .collect();
    let suffix = if skipped_rows.len() > SKIPPED_PREVIEW_LEN {
        ", ..."
    } else {
        ""
    };
    format!(
        "{} rows skipped: validation errors in rows {}{}",
        skipped_rows.len(),
        preview.join(", "),
        suffix
    )
}
