use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed data row, keyed by the header token exactly as it appeared in
/// the uploaded file.
pub type RawRow = BTreeMap<String, String>;

/// Display type guessed for a column from a handful of sampled values.
///
/// Purely advisory: the preview screen uses it to pick a formatter, nothing on
/// the server consults it when validating or storing rows.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
    Text,
}

/// A single problem found while checking an uploaded file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ColumnValidationError {
    /// Normalized column name the problem refers to.
    pub column: String,
    /// Message meant to be shown to the uploader as-is.
    pub message: String,
    /// 1-based line number counting the header line, so the first data row
    /// is row 2. Absent for header-level problems.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<usize>,
}

/// Everything the client needs to render the review screen and, later, to
/// confirm the import of exactly the same bytes.
///
/// The server never trusts a document echoed back by the client; only the
/// `integrity_token` is carried over to the confirm call.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDocument {
    /// Normalized (trimmed, lower-cased) header names, in file order.
    pub headers: Vec<String>,
    /// Up to five accepted rows, keyed by the original header tokens.
    pub sample_rows: Vec<RawRow>,
    /// Number of data rows found in the file.
    pub row_count: usize,
    /// Rows that passed validation and would be imported.
    pub valid_row_count: usize,
    pub skipped_row_count: usize,
    pub column_types: BTreeMap<String, ColumnType>,
    pub warnings: Vec<String>,
    pub file_name: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_fingerprint: String,
    pub integrity_token: String,
}
