//! Column conversion functions for cleaning.

use crate::utils::{date_from_epoch_days, is_error_marker, is_temporal_dtype, series_to_f64};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Date-only text formats, tried in order.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Date-time text formats, tried after the date-only ones.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Convert a sales column to non-negative floats, filling absent cells with 0.0.
///
/// Returns the values and the number of cells that were filled.
pub(crate) fn sales_to_filled(series: &Series) -> PolarsResult<(Vec<f64>, usize)> {
    let mut filled = 0usize;
    let values = series_to_f64(series)?
        .into_iter()
        .map(|v| match v {
            Some(x) if x >= 0.0 => x,
            _ => {
                filled += 1;
                0.0
            }
        })
        .collect();
    Ok((values, filled))
}

/// Convert the critic score column to optional floats.
pub(crate) fn score_to_optional(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    series_to_f64(series)
}

/// Parse a single release date cell.
pub(crate) fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_error_marker(trimmed) {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Parse a release date column into optional dates.
///
/// Returns the dates and the number of non-empty cells that failed to parse.
/// A failure only affects its own row.
pub(crate) fn release_dates(series: &Series) -> PolarsResult<(Vec<Option<NaiveDate>>, usize)> {
    if is_temporal_dtype(series.dtype()) {
        let days = series.cast(&DataType::Date)?.cast(&DataType::Int32)?;
        let dates = days
            .i32()?
            .into_iter()
            .map(|d| d.and_then(date_from_epoch_days))
            .collect();
        return Ok((dates, 0));
    }

    let text = series.cast(&DataType::String)?;
    let mut unparseable = 0usize;
    let dates = text
        .str()?
        .into_iter()
        .map(|cell| match cell {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed = parse_date_str(raw);
                if parsed.is_none() {
                    unparseable += 1;
                }
                parsed
            }
            _ => None,
        })
        .collect();
    Ok((dates, unparseable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_absent_become_zero() {
        let series = Series::new("na_sales".into(), &[Some(1.5), None, Some(0.0)]);
        let (values, filled) = sales_to_filled(&series).unwrap();
        assert_eq!(values, vec![1.5, 0.0, 0.0]);
        assert_eq!(filled, 1);
    }

    #[test]
    fn test_sales_text_and_negative_values() {
        let series = Series::new(
            "jp_sales".into(),
            &[Some("0.25"), Some("N/A"), Some("-1"), Some("")],
        );
        let (values, filled) = sales_to_filled(&series).unwrap();
        assert_eq!(values, vec![0.25, 0.0, 0.0, 0.0]);
        assert_eq!(filled, 3);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2013, 9, 17);
        assert_eq!(parse_date_str("2013-09-17"), expected);
        assert_eq!(parse_date_str("2013/09/17"), expected);
        assert_eq!(parse_date_str("17/09/2013"), expected);
        assert_eq!(parse_date_str("2013-09-17 00:00:00"), expected);
        assert_eq!(parse_date_str("2013-09-17T08:30:00"), expected);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date_str("soon"), None);
        assert_eq!(parse_date_str("2013-13-45"), None);
        assert_eq!(parse_date_str("unknown"), None);
        assert_eq!(parse_date_str(""), None);
    }

    #[test]
    fn test_release_dates_counts_failures_only_for_non_empty() {
        let series = Series::new(
            "release_date".into(),
            &[Some("2001-03-21"), Some("tbd"), None, Some(" ")],
        );
        let (dates, unparseable) = release_dates(&series).unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2001, 3, 21));
        assert_eq!(dates[1], None);
        assert_eq!(dates[2], None);
        assert_eq!(dates[3], None);
        assert_eq!(unparseable, 1);
    }

    #[test]
    fn test_release_dates_from_date_dtype() {
        let series = Series::new("release_date".into(), &[Some(0i32), None])
            .cast(&DataType::Date)
            .unwrap();
        let (dates, unparseable) = release_dates(&series).unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(dates[1], None);
        assert_eq!(unparseable, 0);
    }
}
