//! Converts accepted raw rows into the typed shape stored in `data_rows`.

use super::headers::HeaderMap;
use super::rows::{too_long, NumberedRow, LIMITED_COLUMNS};
use super::values::{exceeds_text_limit, parse_amount, parse_date};
use chrono::NaiveDate;
use ingest_common::model::csv::{ColumnValidationError, RawRow};
use rayon::prelude::*;
use serde::Serialize;

/// A row ready for insertion. Organization, dataset and source type are
/// attached at persistence time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRow {
    pub category: String,
    pub parent_category: Option<String>,
    pub date: NaiveDate,
    /// Decimal text with thousands separators removed; never routed through
    /// a float.
    pub amount: String,
    pub label: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

fn value<'a>(row: &'a RawRow, header_map: &HeaderMap, column: &str) -> Option<&'a str> {
    header_map
        .get(column)
        .and_then(|key| row.get(key))
        .map(String::as_str)
}

fn optional(row: &RawRow, header_map: &HeaderMap, column: &str) -> Option<String> {
    value(row, header_map, column)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn unconvertible(row_number: usize, column: &str, raw: &str) -> ColumnValidationError {
    ColumnValidationError {
        column: column.to_string(),
        message: format!(
            "Row {}: We couldn't convert '{}' in column '{}' for import.",
            row_number, raw, column
        ),
        row: Some(row_number),
    }
}

/// Normalizes one accepted row.
///
/// Sampled rows always convert. Rows past the validation sample were never
/// checked, so a value that cannot be stored is reported instead of guessed.
pub fn normalize_row(
    row: &NumberedRow,
    header_map: &HeaderMap,
) -> Result<NormalizedRow, ColumnValidationError> {
    let raw_date = value(&row.values, header_map, "date").unwrap_or("");
    let date =
        parse_date(raw_date).ok_or_else(|| unconvertible(row.row_number, "date", raw_date))?;

    let raw_amount = value(&row.values, header_map, "amount").unwrap_or("");
    let amount =
        parse_amount(raw_amount).ok_or_else(|| unconvertible(row.row_number, "amount", raw_amount))?;

    let category = value(&row.values, header_map, "category")
        .unwrap_or("")
        .trim()
        .to_string();
    if category.is_empty() {
        return Err(unconvertible(row.row_number, "category", ""));
    }
    for column in LIMITED_COLUMNS {
        if exceeds_text_limit(value(&row.values, header_map, column).unwrap_or("")) {
            return Err(too_long(row.row_number, column));
        }
    }

    Ok(NormalizedRow {
        category,
        parent_category: optional(&row.values, header_map, "parent_category"),
        date,
        amount,
        label: optional(&row.values, header_map, "label"),
        metadata: None,
    })
}

/// Normalizes every row on the rayon pool, preserving order. The first
/// failing row, in file order, is returned as the error.
pub fn normalize_rows(
    rows: &[NumberedRow],
    header_map: &HeaderMap,
) -> Result<Vec<NormalizedRow>, ColumnValidationError> {
    let results: Vec<Result<NormalizedRow, ColumnValidationError>> = rows
        .par_iter()
        .map(|row| normalize_row(row, header_map))
        .collect();
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(row_number: usize, pairs: &[(&str, &str)]) -> NumberedRow {
        NumberedRow {
            row_number,
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn map(headers: &[&str]) -> HeaderMap {
        let owned: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        HeaderMap::build(&owned)
    }

    #[test]
    fn normalizes_required_fields() {
        let row = numbered(2, &[("date", "2025-01-15"), ("amount", "1,200.00"), ("category", "  Revenue ")]);
        let out = normalize_row(&row, &map(&["date", "amount", "category"])).unwrap();
        assert_eq!(out.category, "Revenue");
        assert_eq!(out.amount, "1200.00");
        assert_eq!(out.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(out.parent_category, None);
        assert_eq!(out.label, None);
        assert_eq!(out.metadata, None);
    }

    #[test]
    fn keeps_optional_columns_and_blanks_become_none() {
        let headers = map(&["Date", "Amount", "Category", "Label", "Parent_Category"]);
        let filled = numbered(
            2,
            &[("Date", "2025-01-15"), ("Amount", "5"), ("Category", "Office"), ("Label", " Paper "), ("Parent_Category", "Expenses")],
        );
        let blank = numbered(
            3,
            &[("Date", "2025-01-15"), ("Amount", "5"), ("Category", "Office"), ("Label", "   "), ("Parent_Category", "")],
        );
        let out = normalize_rows(&[filled, blank], &headers).unwrap();
        assert_eq!(out[0].label.as_deref(), Some("Paper"));
        assert_eq!(out[0].parent_category.as_deref(), Some("Expenses"));
        assert_eq!(out[1].label, None);
        assert_eq!(out[1].parent_category, None);
    }

    #[test]
    fn amount_text_is_preserved_exactly() {
        let row = numbered(2, &[("date", "2025-01-15"), ("amount", "0.10000000000000000001"), ("category", "x")]);
        let out = normalize_row(&row, &map(&["date", "amount", "category"])).unwrap();
        assert_eq!(out.amount, "0.10000000000000000001");
    }

    #[test]
    fn over_long_text_is_refused() {
        let headers = map(&["date", "amount", "category", "parent_category"]);
        let long = "p".repeat(256);
        let row = numbered(
            140,
            &[("date", "2025-01-15"), ("amount", "1"), ("category", "Office"), ("parent_category", long.as_str())],
        );
        let err = normalize_row(&row, &headers).unwrap_err();
        assert_eq!(err.column, "parent_category");
        assert_eq!(err.row, Some(140));
    }

    #[test]
    fn reports_first_unconvertible_row_in_order() {
        let headers = map(&["date", "amount", "category"]);
        let rows: Vec<NumberedRow> = (0..500)
            .map(|i| {
                let date = if i == 300 || i == 400 { "garbage" } else { "2025-01-15" };
                numbered(i + 2, &[("date", date), ("amount", "1"), ("category", "c")])
            })
            .collect();
        let err = normalize_rows(&rows, &headers).unwrap_err();
        assert_eq!(err.row, Some(302));
        assert_eq!(err.column, "date");
    }
}
