use crate::config::AggregationKind;
use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Column Names
// ============================================================================

/// Column names of the sales dataset.
pub mod columns {
    pub const TITLE: &str = "title";
    pub const CONSOLE: &str = "console";
    pub const GENRE: &str = "genre";
    pub const PUBLISHER: &str = "publisher";
    pub const DEVELOPER: &str = "developer";
    pub const CRITIC_SCORE: &str = "critic_score";
    pub const RELEASE_DATE: &str = "release_date";
    pub const NA_SALES: &str = "na_sales";
    pub const JP_SALES: &str = "jp_sales";
    pub const PAL_SALES: &str = "pal_sales";
    pub const OTHER_SALES: &str = "other_sales";
    pub const TOTAL_SALES: &str = "total_sales";
    pub const RELEASE_YEAR: &str = "release_year";
    pub const RELEASE_MONTH: &str = "release_month";
    pub const SCORE_RANGE: &str = "score_range";

    /// Derived row-wise sum of the aggregated measures.
    pub const TOTAL: &str = "total";

    /// Columns the loader refuses to work without.
    pub const REQUIRED: [&str; 8] = [
        TITLE,
        CONSOLE,
        GENRE,
        NA_SALES,
        JP_SALES,
        PAL_SALES,
        OTHER_SALES,
        TOTAL_SALES,
    ];

    /// Key columns that are kept when present and synthesized as nulls otherwise.
    pub const OPTIONAL: [&str; 4] = [PUBLISHER, DEVELOPER, CRITIC_SCORE, RELEASE_DATE];

    /// Sales columns, regional first.
    pub const SALES: [&str; 5] = [NA_SALES, JP_SALES, PAL_SALES, OTHER_SALES, TOTAL_SALES];

    /// Fixed column order of a cleaned table.
    pub const CLEANED: [&str; 15] = [
        TITLE,
        CONSOLE,
        GENRE,
        PUBLISHER,
        DEVELOPER,
        CRITIC_SCORE,
        RELEASE_DATE,
        NA_SALES,
        JP_SALES,
        PAL_SALES,
        OTHER_SALES,
        TOTAL_SALES,
        RELEASE_YEAR,
        RELEASE_MONTH,
        SCORE_RANGE,
    ];
}

// ============================================================================
// Dimensions and Measures
// ============================================================================

/// Categorical dimension a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Console,
    Genre,
    Publisher,
    Developer,
    ReleaseYear,
    ScoreRange,
}

impl Dimension {
    /// Name of the cleaned-table column backing this dimension.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Console => columns::CONSOLE,
            Self::Genre => columns::GENRE,
            Self::Publisher => columns::PUBLISHER,
            Self::Developer => columns::DEVELOPER,
            Self::ReleaseYear => columns::RELEASE_YEAR,
            Self::ScoreRange => columns::SCORE_RANGE,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Numeric column that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    NaSales,
    JpSales,
    PalSales,
    OtherSales,
    TotalSales,
    CriticScore,
}

impl Measure {
    /// The four regional sales measures.
    pub const REGIONAL: [Measure; 4] = [
        Measure::NaSales,
        Measure::JpSales,
        Measure::PalSales,
        Measure::OtherSales,
    ];

    /// All sales measures, regional first.
    pub const SALES: [Measure; 5] = [
        Measure::NaSales,
        Measure::JpSales,
        Measure::PalSales,
        Measure::OtherSales,
        Measure::TotalSales,
    ];

    /// Name of the cleaned-table column backing this measure.
    pub fn column(&self) -> &'static str {
        match self {
            Self::NaSales => columns::NA_SALES,
            Self::JpSales => columns::JP_SALES,
            Self::PalSales => columns::PAL_SALES,
            Self::OtherSales => columns::OTHER_SALES,
            Self::TotalSales => columns::TOTAL_SALES,
            Self::CriticScore => columns::CRITIC_SCORE,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ============================================================================
// Tables
// ============================================================================

/// The raw table as loaded, guaranteed to contain the required columns.
#[derive(Debug, Clone)]
pub struct RecordTable {
    df: DataFrame,
}

impl RecordTable {
    /// Wrap a DataFrame after checking it carries every required column.
    pub fn new(df: DataFrame) -> Result<Self> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let missing: Vec<String> = columns::REQUIRED
            .iter()
            .filter(|required| !present.iter().any(|name| name == *required))
            .map(|required| required.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns { columns: missing });
        }

        Ok(Self { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Keep only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            df: self.df.head(Some(n)),
        }
    }
}

/// A cleaned table with the fixed column set of [`columns::CLEANED`].
///
/// Sales columns are non-null `Float64`; `release_year`/`release_month` are
/// nullable `Int32`; `score_range` is a nullable string bucket.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    df: DataFrame,
}

impl CleanedTable {
    pub(crate) fn from_dataframe(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Materialize every row as a [`CleanedRecord`].
    pub fn records(&self) -> Result<Vec<CleanedRecord>> {
        let text = |name: &str| -> Result<Vec<Option<String>>> {
            let series = self.df.column(name)?.as_materialized_series();
            Ok(series
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect())
        };
        let float = |name: &str| -> Result<Vec<Option<f64>>> {
            let series = self.df.column(name)?.as_materialized_series();
            Ok(series.f64()?.into_iter().collect())
        };
        let int = |name: &str| -> Result<Vec<Option<i32>>> {
            let series = self
                .df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Int32)?;
            Ok(series.i32()?.into_iter().collect())
        };

        let titles = text(columns::TITLE)?;
        let consoles = text(columns::CONSOLE)?;
        let genres = text(columns::GENRE)?;
        let publishers = text(columns::PUBLISHER)?;
        let developers = text(columns::DEVELOPER)?;
        let scores = float(columns::CRITIC_SCORE)?;
        let dates = int(columns::RELEASE_DATE)?;
        let na = float(columns::NA_SALES)?;
        let jp = float(columns::JP_SALES)?;
        let pal = float(columns::PAL_SALES)?;
        let other = float(columns::OTHER_SALES)?;
        let total = float(columns::TOTAL_SALES)?;
        let years = int(columns::RELEASE_YEAR)?;
        let months = int(columns::RELEASE_MONTH)?;
        let ranges = text(columns::SCORE_RANGE)?;

        let records = (0..self.df.height())
            .map(|i| CleanedRecord {
                title: titles[i].clone(),
                console: consoles[i].clone(),
                genre: genres[i].clone(),
                publisher: publishers[i].clone(),
                developer: developers[i].clone(),
                critic_score: scores[i],
                release_date: dates[i].and_then(crate::utils::date_from_epoch_days),
                na_sales: na[i].unwrap_or(0.0),
                jp_sales: jp[i].unwrap_or(0.0),
                pal_sales: pal[i].unwrap_or(0.0),
                other_sales: other[i].unwrap_or(0.0),
                total_sales: total[i].unwrap_or(0.0),
                release_year: years[i],
                release_month: months[i].map(|m| m as u32),
                score_range: ranges[i].clone(),
            })
            .collect();

        Ok(records)
    }
}

/// One cleaned row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub title: Option<String>,
    pub console: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
    pub critic_score: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub na_sales: f64,
    pub jp_sales: f64,
    pub pal_sales: f64,
    pub other_sales: f64,
    pub total_sales: f64,
    pub release_year: Option<i32>,
    pub release_month: Option<u32>,
    pub score_range: Option<String>,
}

// ============================================================================
// Aggregates
// ============================================================================

/// One group of an [`AggregateTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: String,
    pub values: Vec<f64>,
}

/// Grouped view keyed by a categorical dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub dimension: Dimension,
    pub kind: AggregationKind,
    /// Value column names, in the order of [`AggregateRow::values`].
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group keys in table order.
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|row| row.key == key)
    }

    /// Value of `column` for the group `key`.
    pub fn value(&self, key: &str, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.get(key).map(|row| row.values[idx])
    }

    /// Keyed mapping for a single value column.
    pub fn column_map(&self, column: &str) -> Option<HashMap<String, f64>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(
            self.rows
                .iter()
                .map(|row| (row.key.clone(), row.values[idx]))
                .collect(),
        )
    }

    /// Render as a DataFrame with the key column first.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut cols: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        let keys: Vec<&str> = self.keys();
        cols.push(Series::new(self.dimension.column().into(), keys).into());

        for (idx, name) in self.columns.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|row| row.values[idx]).collect();
            cols.push(Series::new(name.as_str().into(), values).into());
        }

        Ok(DataFrame::new(cols)?)
    }
}

// ============================================================================
// Outliers
// ============================================================================

/// Mean and standard deviation used for one column's z-scores.
///
/// Both are `None` when no scored row carries a value; `std` is also `None`
/// with a single scored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnZStats {
    pub column: String,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// Zero (or undefined) standard deviation; the column flags nothing.
    pub degenerate: bool,
    pub outlier_count: usize,
}

/// Result of the z-score outlier pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub threshold: f64,
    /// One flag per row of the cleaned table, in table order.
    pub flags: Vec<bool>,
    pub outlier_count: usize,
    /// Rows that took part in the computation (those with a critic score).
    pub evaluated_rows: usize,
    pub column_stats: Vec<ColumnZStats>,
}

impl OutlierReport {
    /// Indices of flagged rows.
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag)
            .map(|(i, _)| i)
            .collect()
    }
}

// ============================================================================
// Profiling
// ============================================================================

/// `describe`-style summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Per-column overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub unique_count: usize,
}

/// Structural overview of a table: shape, nulls, duplicates and numeric summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub shape: (usize, usize),
    pub columns: Vec<ColumnOverview>,
    pub duplicate_count: usize,
    pub numeric: Vec<NumericSummary>,
}

impl DatasetSummary {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn null_count(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.null_count)
    }
}

/// Correlation between critic score and one sales measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCorrelation {
    pub measure: Measure,
    /// Pearson coefficient; `None` when undefined (too few rows or no variance).
    pub coefficient: Option<f64>,
    /// Rows with a critic score that entered the computation.
    pub pairs: usize,
}

// ============================================================================
// Pipeline result
// ============================================================================

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Rows of the raw table that entered cleaning (after any preview cut).
    pub raw_rows: usize,
    /// Profile of the raw table as it entered cleaning.
    pub raw_summary: DatasetSummary,
    pub cleaned: CleanedTable,
    /// `None` when outlier detection is disabled.
    pub outliers: Option<OutlierReport>,
    pub cleaning_actions: Vec<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_table_reports_every_missing_column() {
        let df = df![
            "title" => ["A"],
            "console" => ["PS4"],
        ]
        .unwrap();

        match RecordTable::new(df) {
            Err(PipelineError::MissingColumns { columns }) => {
                assert!(columns.contains(&"genre".to_string()));
                assert!(columns.contains(&"total_sales".to_string()));
                assert_eq!(columns.len(), 6);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_dimension_and_measure_columns() {
        assert_eq!(Dimension::ReleaseYear.column(), "release_year");
        assert_eq!(Measure::PalSales.column(), "pal_sales");
        assert_eq!(Measure::REGIONAL.len(), 4);
    }

    #[test]
    fn test_dimension_serde_snake_case() {
        let json = serde_json::to_string(&Dimension::ReleaseYear).unwrap();
        assert_eq!(json, "\"release_year\"");
        let back: Measure = serde_json::from_str("\"other_sales\"").unwrap();
        assert_eq!(back, Measure::OtherSales);
    }

    fn sample_aggregate() -> AggregateTable {
        AggregateTable {
            dimension: Dimension::Console,
            kind: AggregationKind::Sum,
            columns: vec!["na_sales".to_string(), "jp_sales".to_string()],
            rows: vec![
                AggregateRow {
                    key: "PS4".to_string(),
                    values: vec![3.0, 0.5],
                },
                AggregateRow {
                    key: "PC".to_string(),
                    values: vec![0.0, 0.0],
                },
            ],
        }
    }

    #[test]
    fn test_aggregate_lookup() {
        let table = sample_aggregate();
        assert_eq!(table.keys(), vec!["PS4", "PC"]);
        assert_eq!(table.value("PS4", "jp_sales"), Some(0.5));
        assert_eq!(table.value("PS4", "pal_sales"), None);
        assert_eq!(table.value("XONE", "na_sales"), None);

        let map = table.column_map("na_sales").unwrap();
        assert_eq!(map.get("PS4"), Some(&3.0));
    }

    #[test]
    fn test_aggregate_to_dataframe() {
        let df = sample_aggregate().to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names()[0].as_str(), "console");
    }

    #[test]
    fn test_outlier_indices() {
        let report = OutlierReport {
            threshold: 3.0,
            flags: vec![false, true, false, true],
            outlier_count: 2,
            evaluated_rows: 4,
            column_stats: vec![],
        };
        assert_eq!(report.outlier_indices(), vec![1, 3]);
    }
}
