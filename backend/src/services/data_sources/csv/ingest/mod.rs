//! The parse → validate → normalize pipeline shared by preview and confirm.
//!
//! [`run`] is a pure function of the uploaded bytes and the configured limits.
//! Confirm re-runs it on the freshly uploaded bytes rather than reusing
//! anything from the preview.

pub mod headers;
pub mod infer;
pub mod normalizer;
pub mod parser;
pub mod rows;
pub mod values;

use crate::config::IngestLimits;
use crate::error::IngestError;
use headers::{validate_headers, HeaderMap};
use normalizer::{normalize_rows, NormalizedRow};
use rows::{validate_rows, NumberedRow};

pub const TOO_LARGE_MESSAGE: &str =
    "File size exceeds 10MB limit. Try splitting your data into smaller files.";

/// A file that passed the structural, header and row checks.
#[derive(Debug, Clone)]
pub struct Validated {
    pub headers: Vec<String>,
    pub header_map: HeaderMap,
    pub accepted: Vec<NumberedRow>,
    /// Data rows in the file, accepted or not.
    pub row_count: usize,
    pub warnings: Vec<String>,
}

/// Everything the later stages need from one accepted upload.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub headers: Vec<String>,
    pub accepted: Vec<NumberedRow>,
    pub normalized: Vec<NormalizedRow>,
    pub row_count: usize,
    pub warnings: Vec<String>,
}

impl Ingested {
    pub fn skipped_row_count(&self) -> usize {
        self.row_count - self.accepted.len()
    }
}

pub fn too_large_message(max_bytes: usize) -> String {
    if max_bytes == 10 * 1024 * 1024 {
        TOO_LARGE_MESSAGE.to_string()
    } else {
        format!(
            "File size exceeds {} byte limit. Try splitting your data into smaller files.",
            parser::format_count(max_bytes)
        )
    }
}

/// Parses and validates `bytes` without converting any row.
pub fn validate(bytes: &[u8], limits: &IngestLimits) -> Result<Validated, IngestError> {
    if bytes.len() > limits.max_file_bytes {
        return Err(IngestError::Structural(too_large_message(limits.max_file_bytes)));
    }

    let parsed = parser::parse(bytes, limits.max_rows);
    let table = parsed.table;
    if table.rows.is_empty() {
        let message = parsed
            .warnings
            .into_iter()
            .next()
            .unwrap_or_else(|| parser::NO_ROWS_WARNING.to_string());
        return Err(IngestError::Structural(message));
    }

    let header_check = validate_headers(&table.headers);
    if !header_check.valid {
        return Err(IngestError::HeaderValidation {
            errors: header_check.errors,
        });
    }

    let header_map = HeaderMap::build(&table.headers);
    let checked = validate_rows(
        table.rows,
        &header_map,
        limits.sample_size,
        limits.max_fail_rate,
    );
    if checked.rejected {
        return Err(IngestError::RowValidation {
            message: format!(
                "{} of the first {} rows had validation errors, which is too many to import. Check your data format and try again.",
                checked.skipped_rows.len(),
                checked.sample_size
            ),
            errors: checked.errors,
        });
    }
    if checked.accepted.is_empty() {
        return Err(IngestError::RowValidation {
            message: "No valid rows to import.".to_string(),
            errors: checked.errors,
        });
    }

    let mut warnings = parsed.warnings;
    warnings.extend(checked.warning);

    Ok(Validated {
        headers: table.headers,
        header_map,
        accepted: checked.accepted,
        row_count: table.row_count,
        warnings,
    })
}

impl Validated {
    /// Converts every accepted row. Fails on the first row, in file order,
    /// that cannot be stored.
    pub fn normalize(self) -> Result<Ingested, IngestError> {
        let normalized = normalize_rows(&self.accepted, &self.header_map).map_err(|e| {
            IngestError::RowValidation {
                message: e.message.clone(),
                errors: vec![e],
            }
        })?;
        Ok(Ingested {
            headers: self.headers,
            accepted: self.accepted,
            normalized,
            row_count: self.row_count,
            warnings: self.warnings,
        })
    }
}

/// Full pipeline: [`validate`] then [`Validated::normalize`].
pub fn run(bytes: &[u8], limits: &IngestLimits) -> Result<Ingested, IngestError> {
    validate(bytes, limits)?.normalize()
}
