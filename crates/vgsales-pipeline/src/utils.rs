//! Shared helpers for column conversion.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Remove formatting characters before numeric parsing.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a finite f64.
///
/// Empty strings and error markers yield `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Series Conversion Utilities
// =============================================================================

/// Read a Series as optional floats.
///
/// Numeric columns are cast; string columns are parsed leniently. Cells that
/// cannot be interpreted as a finite number become `None`.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }

    if series.dtype() == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_numeric_string))
            .collect());
    }

    let as_text = series.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_numeric_string))
        .collect())
}

/// Read a Series as optional trimmed strings; blank cells become `None`.
pub fn series_to_text(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let as_text = series.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

// =============================================================================
// Date Utilities
// =============================================================================

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Days since the Unix epoch, the physical representation of a Polars `Date`.
pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Inverse of [`epoch_days`].
pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("1 000"), "1000");
    }

    #[test]
    fn test_is_error_marker() {
        assert!(is_error_marker("N/A"));
        assert!(is_error_marker("  NaN "));
        assert!(!is_error_marker("0.5"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("0.25"), Some(0.25));
        assert_eq!(parse_numeric_string("1,200.5"), Some(1200.5));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("n/a"), None);
        assert_eq!(parse_numeric_string("inf"), None);
    }

    #[test]
    fn test_series_to_f64_from_strings() {
        let series = Series::new("s".into(), &[Some("1.5"), Some("bad"), None, Some("2")]);
        let values = series_to_f64(&series).unwrap();
        assert_eq!(values, vec![Some(1.5), None, None, Some(2.0)]);
    }

    #[test]
    fn test_series_to_f64_from_ints() {
        let series = Series::new("s".into(), &[Some(1i64), None, Some(3)]);
        let values = series_to_f64(&series).unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_series_to_text_blanks_are_none() {
        let series = Series::new("s".into(), &[Some(" PS4 "), Some("  "), None]);
        let values = series_to_text(&series).unwrap();
        assert_eq!(values, vec![Some("PS4".to_string()), None, None]);
    }

    #[test]
    fn test_epoch_days_round_trip_anchor() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(epoch_days(epoch), 0);
        let date = NaiveDate::from_ymd_opt(2013, 9, 17).unwrap();
        assert_eq!(date_from_epoch_days(epoch_days(date)), Some(date));
    }
}
