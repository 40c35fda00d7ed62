//! Z-score outlier detection.
//!
//! Read-only pass over a [`CleanedTable`]: only rows carrying a critic score
//! take part, and flags are reported per row of the full table.

use crate::error::Result;
use crate::profiler::statistics::{mean, sample_std};
use crate::types::{CleanedTable, ColumnZStats, OutlierReport, columns};
use tracing::{debug, info, warn};

/// Columns scored by the detector.
pub const OUTLIER_COLUMNS: [&str; 6] = [
    columns::TOTAL_SALES,
    columns::NA_SALES,
    columns::JP_SALES,
    columns::PAL_SALES,
    columns::OTHER_SALES,
    columns::CRITIC_SCORE,
];

/// Flags rows whose absolute z-score in any scored column exceeds a threshold.
#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector {
    threshold: f64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self { threshold: 3.0 }
    }
}

impl OutlierDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run the detector.
    ///
    /// A column with zero or undefined standard deviation flags no rows.
    pub fn detect(&self, table: &CleanedTable) -> Result<OutlierReport> {
        let df = table.dataframe();
        let height = df.height();

        let scores = df.column(columns::CRITIC_SCORE)?.as_materialized_series();
        let eligible: Vec<usize> = scores
            .f64()?
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect();

        info!(
            "Scoring {} of {} rows for outliers (|z| > {})",
            eligible.len(),
            height,
            self.threshold
        );

        let mut flags = vec![false; height];
        let mut column_stats = Vec::with_capacity(OUTLIER_COLUMNS.len());

        for name in OUTLIER_COLUMNS {
            let series = df.column(name)?.as_materialized_series();
            let all_values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
            // Eligible rows have a score, and sales are never null after cleaning
            let values: Vec<(usize, f64)> = eligible
                .iter()
                .filter_map(|&i| all_values[i].map(|v| (i, v)))
                .collect();
            let plain: Vec<f64> = values.iter().map(|(_, v)| *v).collect();

            let mean = mean(&plain);
            let std = sample_std(&plain);

            let mut outlier_count = 0usize;
            let degenerate = match (mean, std) {
                (Some(mean), Some(std)) if std.is_finite() && std > 0.0 => {
                    for (i, v) in &values {
                        if ((v - mean) / std).abs() > self.threshold {
                            flags[*i] = true;
                            outlier_count += 1;
                        }
                    }
                    false
                }
                _ => {
                    if !plain.is_empty() {
                        warn!(
                            "Column '{}' has zero standard deviation; no outliers flagged for it",
                            name
                        );
                    }
                    true
                }
            };

            debug!(
                "  {}: mean={:?}, std={:?}, outliers={}",
                name, mean, std, outlier_count
            );

            column_stats.push(ColumnZStats {
                column: name.to_string(),
                mean,
                std,
                degenerate,
                outlier_count,
            });
        }

        let outlier_count = flags.iter().filter(|f| **f).count();
        info!("Flagged {} outlier rows", outlier_count);

        Ok(OutlierReport {
            threshold: self.threshold,
            flags,
            outlier_count,
            evaluated_rows: eligible.len(),
            column_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::DataCleaner;
    use crate::types::RecordTable;
    use polars::prelude::*;

    /// Build a cleaned table where every row varies only in total sales and
    /// critic score.
    fn cleaned(total: &[f64], scores: &[Option<f64>]) -> CleanedTable {
        let n = total.len();
        let df = df![
            "title" => vec!["t"; n],
            "console" => vec!["PS4"; n],
            "genre" => vec!["Action"; n],
            "critic_score" => scores.to_vec(),
            "total_sales" => total.to_vec(),
            "na_sales" => vec![1.0; n],
            "jp_sales" => vec![1.0; n],
            "pal_sales" => vec![1.0; n],
            "other_sales" => vec![1.0; n],
        ]
        .unwrap();
        let (table, _) = DataCleaner.clean(&RecordTable::new(df).unwrap()).unwrap();
        table
    }

    fn spread_with_spike() -> CleanedTable {
        let mut total: Vec<f64> = (0..20).map(|i| 1.0 + (i % 3) as f64 * 0.1).collect();
        total.push(50.0);
        let scores: Vec<Option<f64>> = vec![Some(7.0); total.len()];
        cleaned(&total, &scores)
    }

    #[test]
    fn test_spike_is_flagged() {
        let report = OutlierDetector::default().detect(&spread_with_spike()).unwrap();
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outlier_indices(), vec![20]);
        assert_eq!(report.flags.len(), 21);
    }

    #[test]
    fn test_constant_columns_are_degenerate() {
        let report = OutlierDetector::default().detect(&spread_with_spike()).unwrap();
        let na = report
            .column_stats
            .iter()
            .find(|s| s.column == "na_sales")
            .unwrap();
        assert!(na.degenerate);
        assert_eq!(na.outlier_count, 0);
        assert_eq!(na.mean, Some(1.0));
        assert_eq!(na.std, Some(0.0));
    }

    #[test]
    fn test_rows_without_score_are_excluded() {
        let mut total: Vec<f64> = (0..20).map(|i| 1.0 + (i % 3) as f64 * 0.1).collect();
        total.push(50.0);
        let mut scores: Vec<Option<f64>> = vec![Some(7.0); total.len()];
        scores[20] = None;

        let table = cleaned(&total, &scores);
        let report = OutlierDetector::default().detect(&table).unwrap();

        assert_eq!(report.evaluated_rows, 20);
        assert_eq!(report.outlier_count, 0);
        assert!(!report.flags[20]);
        // The row stays in the table
        assert_eq!(table.height(), 21);
    }

    #[test]
    fn test_lower_threshold_never_flags_fewer() {
        let table = spread_with_spike();
        let mut previous = 0usize;
        for threshold in [5.0, 4.0, 3.0, 2.0, 1.0, 0.5, 0.1] {
            let count = OutlierDetector::new(threshold)
                .detect(&table)
                .unwrap()
                .outlier_count;
            assert!(count >= previous, "threshold {} flagged fewer rows", threshold);
            previous = count;
        }
    }

    #[test]
    fn test_single_scored_row_flags_nothing() {
        let table = cleaned(&[1.0, 100.0], &[Some(6.0), None]);
        let report = OutlierDetector::default().detect(&table).unwrap();
        assert_eq!(report.evaluated_rows, 1);
        assert_eq!(report.outlier_count, 0);
        assert!(report.column_stats.iter().all(|s| s.degenerate));
    }

    #[test]
    fn test_no_scored_rows_reports_no_stats() {
        let table = cleaned(&[1.0, 2.0, 3.0], &[None, None, None]);
        let report = OutlierDetector::default().detect(&table).unwrap();

        assert_eq!(report.evaluated_rows, 0);
        assert_eq!(report.flags, vec![false; 3]);
        for stats in &report.column_stats {
            assert!(stats.degenerate);
            assert_eq!(stats.mean, None);
            assert_eq!(stats.std, None);
        }
    }

    #[test]
    fn test_single_scored_row_has_mean_but_no_std() {
        let table = cleaned(&[4.0, 100.0], &[Some(6.0), None]);
        let report = OutlierDetector::default().detect(&table).unwrap();
        let total = report
            .column_stats
            .iter()
            .find(|s| s.column == "total_sales")
            .unwrap();
        assert_eq!(total.mean, Some(4.0));
        assert_eq!(total.std, None);
    }

    #[test]
    fn test_empty_table() {
        let table = cleaned(&[], &[]);
        let report = OutlierDetector::default().detect(&table).unwrap();
        assert_eq!(report.outlier_count, 0);
        assert!(report.flags.is_empty());
    }
}
