//! Field-level readers shared by validation, type inference and normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Reads a calendar date from the common spreadsheet formats.
///
/// ISO dates are preferred. Slash dates with the year last are read
/// month-first. Timestamps with an offset are converted to UTC before the date
/// is taken.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(v) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(v, f).ok())
    {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(v, f).ok())
}

/// Strips whitespace and thousands separators, keeping the decimal text
/// otherwise untouched.
pub fn clean_amount(value: &str) -> String {
    value.trim().replace(',', "")
}

/// The cleaned amount as plain decimal text: optional minus sign, digits,
/// optional fraction. A bare leading dot gains a zero and a trailing dot is
/// dropped; exponents and anything else are refused.
pub fn parse_amount(value: &str) -> Option<String> {
    let cleaned = clean_amount(value);
    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
        return None;
    }

    let mut out = String::with_capacity(unsigned.len() + 2);
    if negative {
        out.push('-');
    }
    out.push_str(if whole.is_empty() { "0" } else { whole });
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    Some(out)
}

/// Longest stored category, label or parent category, in characters.
pub const MAX_TEXT_CHARS: usize = 255;

pub fn exceeds_text_limit(value: &str) -> bool {
    value.trim().chars().count() > MAX_TEXT_CHARS
}

pub fn is_valid_date(value: &str) -> bool {
    parse_date(value).is_some()
}

pub fn is_valid_amount(value: &str) -> bool {
    parse_amount(value).is_some()
}
