//! Canned analytical questions and the report bundling their answers.

use super::GroupedAggregator;
use crate::config::{AggregationKind, AggregationSpec, PipelineConfig, SortOrder};
use crate::error::Result;
use crate::profiler::DataProfiler;
use crate::types::{
    AggregateTable, CleanedTable, ColumnZStats, DatasetSummary, Dimension, Measure,
    OutlierReport, PipelineResult, ScoreCorrelation, columns,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

fn descending_by(column: &str) -> SortOrder {
    SortOrder::Column {
        column: column.to_string(),
        descending: true,
    }
}

fn regional_by(
    table: &CleanedTable,
    dimension: Dimension,
    allowed: &[String],
) -> Result<AggregateTable> {
    let spec = AggregationSpec::builder(dimension)
        .allow_list(allowed.iter().cloned())
        .measures(Measure::REGIONAL)
        .include_total(true)
        .sort(descending_by(columns::TOTAL))
        .build()?;
    GroupedAggregator::aggregate(table, &spec)
}

fn top_by_total_sales(table: &CleanedTable, dimension: Dimension, n: usize) -> Result<AggregateTable> {
    let spec = AggregationSpec::builder(dimension)
        .measure(Measure::TotalSales)
        .sort(descending_by(columns::TOTAL_SALES))
        .limit(n)
        .build()?;
    GroupedAggregator::aggregate(table, &spec)
}

/// Regional sales per popular console, with a `total`, best sellers first.
pub fn platform_regional_sales(table: &CleanedTable, consoles: &[String]) -> Result<AggregateTable> {
    regional_by(table, Dimension::Console, consoles)
}

/// Regional sales per popular genre, with a `total`, best sellers first.
pub fn genre_regional_sales(table: &CleanedTable, genres: &[String]) -> Result<AggregateTable> {
    regional_by(table, Dimension::Genre, genres)
}

/// The `n` publishers with the highest summed `total_sales`.
pub fn top_publishers(table: &CleanedTable, n: usize) -> Result<AggregateTable> {
    top_by_total_sales(table, Dimension::Publisher, n)
}

/// The `n` developers with the highest summed `total_sales`.
pub fn top_developers(table: &CleanedTable, n: usize) -> Result<AggregateTable> {
    top_by_total_sales(table, Dimension::Developer, n)
}

/// Total and regional sales per release year, oldest first.
pub fn yearly_sales_trend(table: &CleanedTable) -> Result<AggregateTable> {
    let spec = AggregationSpec::builder(Dimension::ReleaseYear)
        .measure(Measure::TotalSales)
        .measures(Measure::REGIONAL)
        .sort(SortOrder::Key { descending: false })
        .build()?;
    GroupedAggregator::aggregate(table, &spec)
}

/// Mean `total_sales` per critic-score bucket, lowest bucket first.
pub fn sales_by_score_range(table: &CleanedTable) -> Result<AggregateTable> {
    let spec = AggregationSpec::builder(Dimension::ScoreRange)
        .measure(Measure::TotalSales)
        .kind(AggregationKind::Mean)
        .sort(SortOrder::Key { descending: false })
        .build()?;
    GroupedAggregator::aggregate(table, &spec)
}

/// Outlier pass results without the per-row flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub threshold: f64,
    pub evaluated_rows: usize,
    pub outlier_count: usize,
    pub column_stats: Vec<ColumnZStats>,
}

impl From<&OutlierReport> for OutlierSummary {
    fn from(report: &OutlierReport) -> Self {
        Self {
            threshold: report.threshold,
            evaluated_rows: report.evaluated_rows,
            outlier_count: report.outlier_count,
            column_stats: report.column_stats.clone(),
        }
    }
}

/// Every canned aggregate, keyed by question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannedAggregates {
    pub platform_regional_sales: AggregateTable,
    pub genre_regional_sales: AggregateTable,
    pub top_publishers: AggregateTable,
    pub top_developers: AggregateTable,
    pub yearly_sales_trend: AggregateTable,
    pub sales_by_score_range: AggregateTable,
}

/// Full analysis of a cleaned table, for CLI and library output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Profile of the raw table before cleaning, when it is known.
    pub raw_summary: Option<DatasetSummary>,
    /// Profile of the cleaned table.
    pub summary: DatasetSummary,
    pub outliers: Option<OutlierSummary>,
    pub correlations: Vec<ScoreCorrelation>,
    pub aggregates: CannedAggregates,
}

impl AnalysisReport {
    /// Profile the table and answer every canned question.
    pub fn build(
        table: &CleanedTable,
        outliers: Option<&OutlierReport>,
        config: &PipelineConfig,
    ) -> Result<Self> {
        info!("Building analysis report over {} rows", table.height());

        let lists = &config.reference_lists;
        let aggregates = CannedAggregates {
            platform_regional_sales: platform_regional_sales(table, &lists.popular_consoles)?,
            genre_regional_sales: genre_regional_sales(table, &lists.popular_genres)?,
            top_publishers: top_publishers(table, config.top_n)?,
            top_developers: top_developers(table, config.top_n)?,
            yearly_sales_trend: yearly_sales_trend(table)?,
            sales_by_score_range: sales_by_score_range(table)?,
        };

        Ok(Self {
            generated_at: Local::now().to_rfc3339(),
            raw_summary: None,
            summary: DataProfiler::summarize(table.dataframe())?,
            outliers: outliers.map(OutlierSummary::from),
            correlations: DataProfiler::score_correlations(table)?,
            aggregates,
        })
    }

    /// Build the report for a pipeline run, keeping its raw-table profile.
    pub fn from_result(result: &PipelineResult, config: &PipelineConfig) -> Result<Self> {
        let mut report = Self::build(&result.cleaned, result.outliers.as_ref(), config)?;
        report.raw_summary = Some(result.raw_summary.clone());
        Ok(report)
    }
}
