//! Display-type hints for the preview screen.

use super::headers::normalize_header;
use super::rows::NumberedRow;
use super::values::{clean_amount, is_valid_amount, parse_date};
use ingest_common::model::csv::ColumnType;
use std::collections::BTreeMap;

/// Non-empty values inspected per column.
const VALUES_PER_COLUMN: usize = 5;
/// Shortest text accepted as a date; keeps bare numbers like `2025` out.
const MIN_DATE_LEN: usize = 8;

pub fn classify(value: &str) -> ColumnType {
    let cleaned = clean_amount(value);
    if is_valid_amount(&cleaned) {
        ColumnType::Number
    } else if cleaned.chars().count() >= MIN_DATE_LEN && parse_date(&cleaned).is_some() {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

/// Majority vote over the first few non-empty values of each column, keyed
/// by normalized header. Ties and empty columns fall back to `Text`.
pub fn infer_column_types(rows: &[NumberedRow], headers: &[String]) -> BTreeMap<String, ColumnType> {
    headers
        .iter()
        .map(|header| {
            let votes: Vec<ColumnType> = rows
                .iter()
                .filter_map(|row| row.values.get(header))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .take(VALUES_PER_COLUMN)
                .map(classify)
                .collect();
            (normalize_header(header), majority(&votes))
        })
        .collect()
}

fn majority(votes: &[ColumnType]) -> ColumnType {
    let count = |t: ColumnType| votes.iter().filter(|v| **v == t).count();
    let (numbers, dates, texts) = (
        count(ColumnType::Number),
        count(ColumnType::Date),
        count(ColumnType::Text),
    );
    if numbers > dates && numbers > texts {
        ColumnType::Number
    } else if dates > numbers && dates > texts {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}
