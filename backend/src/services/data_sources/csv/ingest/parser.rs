//! Turns raw upload bytes into a header list and keyed rows.
//!
//! Parsing is tolerant (ragged rows, blank lines, a leading BOM) but bounded
//! by the row cap. Structural problems are reported as a single warning on an
//! otherwise empty table; this function never fails and never touches I/O.

use ingest_common::model::csv::RawRow;

pub const EMPTY_FILE_WARNING: &str =
    "This file appears to be empty. Download our sample template to see the expected format.";
pub const NO_ROWS_WARNING: &str =
    "File has headers but no data rows. Download our sample template to see the expected format.";

/// Header tokens and rows exactly as read from one upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    /// Trimmed header tokens, original casing preserved.
    pub headers: Vec<String>,
    /// Data rows keyed by header token. Empty when the file was rejected.
    pub rows: Vec<RawRow>,
    /// Data rows seen in the file, including any beyond the row cap.
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    pub table: RawTable,
    pub warnings: Vec<String>,
}

impl ParseOutcome {
    fn rejected(headers: Vec<String>, row_count: usize, warning: String) -> Self {
        ParseOutcome {
            table: RawTable {
                headers,
                rows: Vec::new(),
                row_count,
            },
            warnings: vec![warning],
        }
    }
}

/// Drops a UTF-8 byte-order mark if the content starts with one.
pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Parses `bytes` as comma-separated text with a header line.
///
/// Rows with fewer fields than the header simply lack the missing keys; extra
/// fields are ignored. More than `max_rows` data rows rejects the whole file.
pub fn parse(bytes: &[u8], max_rows: usize) -> ParseOutcome {
    let decoded = String::from_utf8_lossy(bytes);
    let content = strip_bom(&decoded);

    if content.trim().is_empty() {
        return ParseOutcome::rejected(Vec::new(), 0, EMPTY_FILE_WARNING.to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => return ParseOutcome::rejected(Vec::new(), 0, unreadable(&e)),
    };

    let mut rows = Vec::new();
    let mut row_count = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => return ParseOutcome::rejected(headers, row_count, unreadable(&e)),
        };
        if is_blank(&record) {
            continue;
        }
        row_count += 1;
        // Keep counting past the cap so the warning can report the real size.
        if row_count <= max_rows {
            rows.push(to_row(&headers, &record));
        }
    }

    if row_count == 0 {
        return ParseOutcome::rejected(headers, 0, NO_ROWS_WARNING.to_string());
    }

    if row_count > max_rows {
        let warning = format!(
            "File has {} rows, which exceeds our limit of {}. Try splitting your data into smaller files.",
            format_count(row_count),
            format_count(max_rows)
        );
        return ParseOutcome::rejected(headers, row_count, warning);
    }

    ParseOutcome {
        table: RawTable {
            headers,
            rows,
            row_count,
        },
        warnings: Vec::new(),
    }
}

/// A whitespace-only line comes back as one empty field.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(str::is_empty)
}

fn to_row(headers: &[String], record: &csv::StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.clone(), value.to_string()))
        .collect()
}

fn unreadable(e: &csv::Error) -> String {
    let line = e
        .position()
        .map(|p| format!(" near line {}", p.line()))
        .unwrap_or_default();
    format!(
        "We couldn't read this file as CSV{}. Check that it is saved as comma-separated text.",
        line
    )
}

/// Formats `n` with comma thousands separators, e.g. `50,000`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
