//! Main pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, preview truncation, cleaning and outlier detection.

use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{Result, ResultExt};
use crate::loader::DatasetLoader;
use crate::pipeline::OutlierDetector;
use crate::profiler::DataProfiler;
use crate::types::{PipelineResult, RecordTable};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// The sales dataset pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use vgsales_pipeline::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().preview_rows(1000).build()?)
///     .build()?
///     .run("vgchartz-2024.csv")?;
///
/// println!("{} cleaned rows", result.cleaned.height());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    cleaner: DataCleaner,
    detector: OutlierDetector,
}

// Stages hold no shared mutable state
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a file and process it.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<PipelineResult> {
        let path = path.as_ref();
        info!("Step 1: Loading dataset from {}", path.display());

        let table = DatasetLoader::load(path).inspect_err(|e| error!("Load failed: {}", e))?;
        self.process(table)
    }

    /// Process an already loaded table.
    pub fn process(&self, table: RecordTable) -> Result<PipelineResult> {
        let start_time = Instant::now();

        let table = match self.config.preview_rows {
            Some(n) if n < table.height() => {
                info!("Step 2: Restricting preview to the first {} of {} rows", n, table.height());
                table.head(n)
            }
            _ => {
                info!("Step 2: Using all {} rows", table.height());
                table
            }
        };
        let raw_rows = table.height();
        let raw_summary =
            DataProfiler::summarize(table.dataframe()).context("Profiling raw table failed")?;

        info!("Step 3: Cleaning and deriving columns...");
        let (cleaned, cleaning_actions) = self
            .cleaner
            .clean(&table)
            .context("Cleaning failed")?;

        let outliers = if self.config.detect_outliers {
            info!("Step 4: Detecting outliers...");
            Some(self.detector.detect(&cleaned).context("Outlier detection failed")?)
        } else {
            info!("Step 4: Skipping outlier detection (disabled)");
            None
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Pipeline completed in {} ms", duration_ms);

        Ok(PipelineResult {
            raw_rows,
            raw_summary,
            cleaned,
            outliers,
            cleaning_actions,
            duration_ms,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            detector: OutlierDetector::new(config.outlier_threshold),
            cleaner: DataCleaner,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use polars::prelude::*;

    fn table(rows: usize) -> RecordTable {
        let df = df![
            "title" => (0..rows).map(|i| format!("t{}", i)).collect::<Vec<_>>(),
            "console" => vec!["PS4"; rows],
            "genre" => vec!["Action"; rows],
            "critic_score" => vec![Some(7.0); rows],
            "total_sales" => vec![1.0; rows],
            "na_sales" => vec![Some(1.0); rows],
            "jp_sales" => vec![None::<f64>; rows],
            "pal_sales" => vec![0.0; rows],
            "other_sales" => vec![0.0; rows],
        ]
        .unwrap();
        RecordTable::new(df).unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &PipelineConfig::default());
        assert_eq!(pipeline.detector.threshold(), 3.0);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            outlier_threshold: -1.0,
            ..PipelineConfig::default()
        };
        let err = Pipeline::builder().config(config).build().unwrap_err();
        assert!(matches!(err, ConfigValidationError::InvalidThreshold(t) if t == -1.0));
    }

    #[test]
    fn test_process_with_preview() {
        let config = PipelineConfig::builder().preview_rows(3).build().unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();

        let result = pipeline.process(table(10)).unwrap();
        assert_eq!(result.raw_rows, 3);
        assert_eq!(result.raw_summary.shape, (3, 9));
        assert_eq!(result.raw_summary.null_count("jp_sales"), Some(3));
        assert_eq!(result.cleaned.height(), 3);
        assert_eq!(result.outliers.as_ref().map(|o| o.flags.len()), Some(3));
        assert!(result.cleaning_actions.iter().any(|a| a.contains("'jp_sales'")));
    }

    #[test]
    fn test_preview_larger_than_table_keeps_everything() {
        let config = PipelineConfig::builder().preview_rows(100).build().unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();
        assert_eq!(pipeline.process(table(4)).unwrap().raw_rows, 4);
    }

    #[test]
    fn test_outliers_can_be_disabled() {
        let config = PipelineConfig::builder()
            .detect_outliers(false)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();
        assert!(pipeline.process(table(2)).unwrap().outliers.is_none());
    }

    #[test]
    fn test_run_missing_file() {
        let pipeline = Pipeline::builder().build().unwrap();
        let err = pipeline.run("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
