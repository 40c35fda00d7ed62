//! Dataset profiling.
//!
//! This module provides:
//! - A structural overview of a table (shape, dtypes, nulls, duplicates)
//! - `describe`-style summaries of numeric columns
//! - Critic-score correlation with each sales measure

pub mod statistics;

use crate::error::Result;
use crate::types::{
    CleanedTable, ColumnOverview, DatasetSummary, Measure, NumericSummary, ScoreCorrelation,
    columns,
};
use crate::utils::{is_numeric_dtype, series_to_f64};
use polars::prelude::*;
use tracing::debug;

/// Data profiler for a quick look at any table.
pub struct DataProfiler;

impl DataProfiler {
    /// Summarize a table.
    pub fn summarize(df: &DataFrame) -> Result<DatasetSummary> {
        let mut overview = Vec::with_capacity(df.width());
        let mut numeric = Vec::new();

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            overview.push(ColumnOverview {
                name: series.name().to_string(),
                dtype: format!("{}", series.dtype()),
                null_count: series.null_count(),
                unique_count: series.n_unique()?,
            });

            if is_numeric_dtype(series.dtype()) {
                numeric.push(Self::describe(series)?);
            }
        }

        let duplicate_count = df.height()
            - df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?
                .height();

        debug!(
            "Profiled {} columns, {} duplicate rows",
            overview.len(),
            duplicate_count
        );

        Ok(DatasetSummary {
            shape: (df.height(), df.width()),
            columns: overview,
            duplicate_count,
            numeric,
        })
    }

    /// `describe`-style summary of one numeric Series; nulls are skipped.
    pub fn describe(series: &Series) -> Result<NumericSummary> {
        let mut values: Vec<f64> = series_to_f64(series)?.into_iter().flatten().collect();
        values.sort_by(|a, b| a.total_cmp(b));

        Ok(NumericSummary {
            column: series.name().to_string(),
            count: values.len(),
            mean: statistics::mean(&values),
            std: statistics::sample_std(&values),
            min: values.first().copied(),
            q25: statistics::quantile_sorted(&values, 0.25),
            median: statistics::quantile_sorted(&values, 0.5),
            q75: statistics::quantile_sorted(&values, 0.75),
            max: values.last().copied(),
        })
    }

    /// Pearson correlation of critic score with every sales measure, over
    /// rows that carry a critic score.
    pub fn score_correlations(table: &CleanedTable) -> Result<Vec<ScoreCorrelation>> {
        let df = table.dataframe();
        let scores: Vec<Option<f64>> = df
            .column(columns::CRITIC_SCORE)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect();

        let mut correlations = Vec::with_capacity(Measure::SALES.len());
        for measure in Measure::SALES {
            let sales: Vec<Option<f64>> = df
                .column(measure.column())?
                .as_materialized_series()
                .f64()?
                .into_iter()
                .collect();

            let (xs, ys): (Vec<f64>, Vec<f64>) = scores
                .iter()
                .zip(&sales)
                .filter_map(|(score, sale)| Some(((*score)?, (*sale)?)))
                .unzip();

            correlations.push(ScoreCorrelation {
                measure,
                coefficient: statistics::pearson(&xs, &ys),
                pairs: xs.len(),
            });
        }

        Ok(correlations)
    }
}
