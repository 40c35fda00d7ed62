//! Data cleaning module for the raw sales table.
//!
//! This module provides functionality for:
//! - Dropping `last_update` and every column outside the key set
//! - Filling absent sales figures with 0.0
//! - Parsing release dates and deriving year/month
//! - Bucketing critic scores into score ranges

mod converters;
pub mod derivations;

pub use derivations::{SCORE_BIN_EDGES, SCORE_BIN_LABELS, score_range};

use crate::error::Result;
use crate::types::{CleanedTable, RecordTable, columns};
use crate::utils::{epoch_days, series_to_text};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Data cleaner turning a [`RecordTable`] into a [`CleanedTable`].
///
/// The input table is never modified; a new table is built column by column.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataCleaner;

impl DataCleaner {
    /// Clean a raw table.
    ///
    /// Returns the cleaned table and a list of human-readable actions taken.
    pub fn clean(&self, table: &RecordTable) -> Result<(CleanedTable, Vec<String>)> {
        let df = table.dataframe();
        let height = df.height();
        let mut actions = Vec::new();

        info!("Cleaning {} rows...", height);

        // 1. Column pruning
        let dropped: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| !Self::is_key_column(name))
            .collect();
        if !dropped.is_empty() {
            debug!("Dropping non-key columns: {:?}", dropped);
            actions.push(format!(
                "Dropped {} non-key columns: {:?}",
                dropped.len(),
                dropped
            ));
        }

        let mut cols: Vec<Column> = Vec::with_capacity(columns::CLEANED.len());

        // 2. Categorical text columns
        for name in [
            columns::TITLE,
            columns::CONSOLE,
            columns::GENRE,
            columns::PUBLISHER,
            columns::DEVELOPER,
        ] {
            let values = match Self::source(df, name) {
                Some(series) => series_to_text(series)?,
                None => {
                    actions.push(format!("Column '{}' absent; filled with nulls", name));
                    vec![None; height]
                }
            };
            cols.push(Series::new(name.into(), values).into());
        }

        // 3. Critic score
        let scores: Vec<Option<f64>> = match Self::source(df, columns::CRITIC_SCORE) {
            Some(series) => converters::score_to_optional(series)?,
            None => {
                actions.push(format!(
                    "Column '{}' absent; filled with nulls",
                    columns::CRITIC_SCORE
                ));
                vec![None; height]
            }
        };

        // 4. Release date
        let (dates, unparseable) = match Self::source(df, columns::RELEASE_DATE) {
            Some(series) => converters::release_dates(series)?,
            None => {
                actions.push(format!(
                    "Column '{}' absent; filled with nulls",
                    columns::RELEASE_DATE
                ));
                (vec![None; height], 0)
            }
        };
        if unparseable > 0 {
            warn!(
                "{} release dates could not be parsed; year/month left empty for those rows",
                unparseable
            );
            actions.push(format!(
                "Left release year/month empty for {} rows with unparseable dates",
                unparseable
            ));
        }

        let score_col = Series::new(columns::CRITIC_SCORE.into(), &scores);
        let date_days: Vec<Option<i32>> = dates.iter().map(|d| d.map(epoch_days)).collect();
        let date_col = Series::new(columns::RELEASE_DATE.into(), date_days).cast(&DataType::Date)?;
        cols.push(score_col.into());
        cols.push(date_col.into());

        // 5. Sales, absent -> 0.0
        for name in columns::SALES {
            let series = Self::source(df, name)
                .ok_or_else(|| crate::error::PipelineError::ColumnNotFound(name.to_string()))?;
            let (values, filled) = converters::sales_to_filled(series)?;
            if filled > 0 {
                debug!("Filled {} missing values in '{}' with 0.0", filled, name);
                actions.push(format!("Filled {} missing values in '{}' with 0.0", filled, name));
            }
            cols.push(Series::new(name.into(), values).into());
        }

        // 6. Derived columns
        let (years, months): (Vec<Option<i32>>, Vec<Option<i32>>) = dates
            .iter()
            .map(|d| match d {
                Some(date) => {
                    let (y, m) = derivations::year_month(*date);
                    (Some(y), Some(m))
                }
                None => (None, None),
            })
            .unzip();
        let ranges: Vec<Option<&str>> = scores
            .iter()
            .map(|s| s.and_then(derivations::score_range))
            .collect();

        cols.push(Series::new(columns::RELEASE_YEAR.into(), years).into());
        cols.push(Series::new(columns::RELEASE_MONTH.into(), months).into());
        cols.push(Series::new(columns::SCORE_RANGE.into(), ranges).into());

        let cleaned = DataFrame::new(cols)?;
        info!("Cleaning complete: {:?}", cleaned.shape());

        Ok((CleanedTable::from_dataframe(cleaned), actions))
    }

    fn is_key_column(name: &str) -> bool {
        columns::REQUIRED.contains(&name) || columns::OPTIONAL.contains(&name)
    }

    fn source<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Series> {
        df.column(name).ok().map(|col| col.as_materialized_series())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw_table() -> RecordTable {
        let df = df![
            "img" => ["/a.jpg", "/b.jpg", "/c.jpg"],
            "title" => ["Alpha", "Beta", "Gamma"],
            "console" => ["PS4", "PS4", "PC"],
            "genre" => ["Action", "Sports", "Action"],
            "publisher" => [Some("Sony"), None, Some("Valve")],
            "developer" => [Some("SIE"), Some("EA"), None],
            "critic_score" => [Some(7.5), None, Some(5.0)],
            "total_sales" => [Some(1.6), Some(2.0), None],
            "na_sales" => [Some(1.0), Some(2.0), None],
            "jp_sales" => [Some(0.5), None, Some(0.0)],
            "pal_sales" => [None, Some(0.0), Some(0.0)],
            "other_sales" => [Some(0.1), None, None],
            "release_date" => [Some("2014-11-04"), Some("not a date"), None],
            "last_update" => [Some("2018-01-03"), None, None],
        ]
        .unwrap();
        RecordTable::new(df).unwrap()
    }

    #[test]
    fn test_cleaned_columns_in_fixed_order() {
        let (cleaned, _) = DataCleaner.clean(&raw_table()).unwrap();
        let names: Vec<String> = cleaned
            .dataframe()
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, columns::CLEANED.to_vec());
        assert!(!names.contains(&"last_update".to_string()));
        assert!(!names.contains(&"img".to_string()));
    }

    #[test]
    fn test_sales_never_null() {
        let (cleaned, actions) = DataCleaner.clean(&raw_table()).unwrap();
        for name in columns::SALES {
            let col = cleaned.dataframe().column(name).unwrap();
            assert_eq!(col.null_count(), 0, "{} has nulls", name);
        }
        let records = cleaned.records().unwrap();
        assert_eq!(records[2].na_sales, 0.0);
        assert_eq!(records[0].pal_sales, 0.0);
        assert!(actions.iter().any(|a| a.contains("'other_sales'")));
    }

    #[test]
    fn test_dates_are_row_tolerant() {
        let (cleaned, actions) = DataCleaner.clean(&raw_table()).unwrap();
        assert_eq!(cleaned.height(), 3);

        let records = cleaned.records().unwrap();
        assert_eq!(records[0].release_date, NaiveDate::from_ymd_opt(2014, 11, 4));
        assert_eq!(records[0].release_year, Some(2014));
        assert_eq!(records[0].release_month, Some(11));
        assert_eq!(records[1].release_year, None);
        assert_eq!(records[1].release_month, None);
        assert_eq!(records[2].release_year, None);
        assert!(actions.iter().any(|a| a.contains("1 rows with unparseable dates")));
    }

    #[test]
    fn test_score_range_derived() {
        let (cleaned, _) = DataCleaner.clean(&raw_table()).unwrap();
        let records = cleaned.records().unwrap();
        assert_eq!(records[0].score_range.as_deref(), Some("7-8"));
        assert_eq!(records[1].score_range, None);
        assert_eq!(records[2].score_range.as_deref(), Some("5-6"));
    }

    #[test]
    fn test_optional_columns_synthesized() {
        let df = df![
            "title" => ["Alpha"],
            "console" => ["PS4"],
            "genre" => ["Action"],
            "total_sales" => [1.0],
            "na_sales" => [1.0],
            "jp_sales" => [0.0],
            "pal_sales" => [0.0],
            "other_sales" => [0.0],
        ]
        .unwrap();
        let table = RecordTable::new(df).unwrap();
        let (cleaned, actions) = DataCleaner.clean(&table).unwrap();

        assert_eq!(cleaned.dataframe().width(), columns::CLEANED.len());
        assert_eq!(cleaned.dataframe().column("publisher").unwrap().null_count(), 1);
        assert_eq!(actions.iter().filter(|a| a.contains("absent")).count(), 4);
    }

    #[test]
    fn test_input_table_untouched() {
        let raw = raw_table();
        let before = raw.dataframe().clone();
        let _ = DataCleaner.clean(&raw).unwrap();
        assert!(raw.dataframe().equals_missing(&before));
    }
}
