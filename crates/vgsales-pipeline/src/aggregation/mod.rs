//! Grouped aggregation over the cleaned table.
//!
//! One parameterized operation driven by an [`AggregationSpec`]:
//! allow-list filtering, grouping in key encounter order, sum or mean of
//! the requested measures, an optional derived `total`, a stable sort and
//! an optional limit.

pub mod queries;

pub use queries::AnalysisReport;

use crate::config::{AggregationKind, AggregationSpec, SortOrder};
use crate::error::{PipelineError, Result};
use crate::types::{AggregateRow, AggregateTable, CleanedTable, columns};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Groups a [`CleanedTable`] by one dimension.
pub struct GroupedAggregator;

impl GroupedAggregator {
    /// Run one aggregation.
    ///
    /// Rows whose key is null never form a group. Allow-listed values absent
    /// from the data yield no row. A mean over a group with no non-null
    /// values is `NaN` and sorts after every real value in either direction.
    pub fn aggregate(table: &CleanedTable, spec: &AggregationSpec) -> Result<AggregateTable> {
        spec.validate()?;

        let key = spec.dimension.column();
        let value_columns = spec.output_columns();

        let source = match &spec.allow_list {
            Some(allowed) => Self::filter_allowed(table.dataframe(), key, allowed)?,
            None => table.dataframe().clone(),
        };

        debug!(
            "Aggregating {} rows by '{}' ({:?} of {:?})",
            source.height(),
            key,
            spec.kind,
            spec.measures
        );

        let aggs: Vec<Expr> = spec
            .measures
            .iter()
            .map(|m| {
                let name = m.column();
                match spec.kind {
                    AggregationKind::Sum => col(name).sum().alias(name),
                    AggregationKind::Mean => col(name).mean().alias(name),
                }
            })
            .collect();

        let mut lf = source
            .lazy()
            .filter(col(key).is_not_null())
            .group_by_stable([col(key)])
            .agg(aggs);

        if spec.include_total
            && let Some(total) = spec
                .measures
                .iter()
                .map(|m| col(m.column()))
                .reduce(|acc, e| acc + e)
        {
            lf = lf.with_column(total.alias(columns::TOTAL));
        }

        lf = match &spec.sort {
            SortOrder::Natural => lf,
            SortOrder::Key { descending } => lf.sort([key], Self::sort_options(*descending)),
            SortOrder::Column { column, descending } => {
                lf.sort([column.as_str()], Self::sort_options(*descending))
            }
        };

        if let Some(limit) = spec.limit {
            lf = lf.limit(limit as IdxSize);
        }

        let out = lf.collect().map_err(|e| PipelineError::AggregationFailed {
            dimension: key.to_string(),
            reason: e.to_string(),
        })?;

        let rows = Self::extract_rows(&out, key, &value_columns)?;
        debug!("Produced {} groups for '{}'", rows.len(), key);

        Ok(AggregateTable {
            dimension: spec.dimension,
            kind: spec.kind,
            columns: value_columns,
            rows,
        })
    }

    fn sort_options(descending: bool) -> SortMultipleOptions {
        SortMultipleOptions::default()
            .with_order_descending(descending)
            .with_nulls_last(true)
            .with_maintain_order(true)
    }

    /// Keep rows whose key, rendered as text, is in `allowed`.
    fn filter_allowed(df: &DataFrame, key: &str, allowed: &[String]) -> Result<DataFrame> {
        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        let keys = df
            .column(key)?
            .as_materialized_series()
            .cast(&DataType::String)?;

        let mask: BooleanChunked = keys
            .str()?
            .into_iter()
            .map(|v| v.is_some_and(|s| allowed.contains(s)))
            .collect();

        Ok(df.filter(&mask)?)
    }

    fn extract_rows(out: &DataFrame, key: &str, value_columns: &[String]) -> Result<Vec<AggregateRow>> {
        let keys = out
            .column(key)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let keys: Vec<String> = keys
            .str()?
            .into_iter()
            .map(|k| k.unwrap_or_default().to_string())
            .collect();

        let mut values: Vec<Vec<f64>> = Vec::with_capacity(value_columns.len());
        for name in value_columns {
            let series = out
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            values.push(
                series
                    .f64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect(),
            );
        }

        Ok(keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| AggregateRow {
                key,
                values: values.iter().map(|col| col[i]).collect(),
            })
            .collect())
    }
}
