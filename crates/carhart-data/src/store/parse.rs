//! Field parsing shared by the file-backed stores.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date in any of the accepted layouts.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts.date());
        }
    }
    Err(DataError::Parse(format!("Unrecognized date: {:?}", raw)))
}

/// Parse an optional numeric field.
///
/// Empty cells, `-` and `NaN` are absent values; thousands separators are
/// stripped.
pub(crate) fn parse_amount(raw: &str) -> Result<Option<f64>> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::Parse(format!("Invalid number: {:?}", raw)))
}

/// Numeric field at a column position; missing cells read as NaN.
pub(crate) fn field_or_nan(record: &csv::StringRecord, index: usize) -> Result<f64> {
    match record.get(index) {
        Some(raw) => Ok(parse_amount(raw)?.unwrap_or(f64::NAN)),
        None => Ok(f64::NAN),
    }
}

/// Optional numeric field at a column position.
pub(crate) fn field_opt(record: &csv::StringRecord, index: usize) -> Result<Option<f64>> {
    match record.get(index) {
        Some(raw) => parse_amount(raw),
        None => Ok(None),
    }
}
