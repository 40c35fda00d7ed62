//! Video Game Sales Pipeline Library
//!
//! Loading, cleaning and grouped aggregation of a video-game sales table,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline is a linear sequence of table-to-table stages:
//!
//! - **Loading**: CSV, TSV or Parquet into a [`RecordTable`], with a schema check
//! - **Cleaning**: column pruning, sales null-filling, date parsing and derived
//!   `release_year`, `release_month` and `score_range` columns
//! - **Outlier Detection**: read-only z-score flags per row
//! - **Aggregation**: one parameterized grouping operation driven by an
//!   [`AggregationSpec`], plus canned analytical questions
//! - **Profiling**: shape, nulls, duplicates, `describe`-style summaries and
//!   critic-score correlations
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vgsales_pipeline::{AggregationSpec, GroupedAggregator, Pipeline, PipelineConfig, SortOrder};
//! use vgsales_pipeline::types::{Dimension, Measure};
//!
//! let result = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .build()?
//!     .run("vgchartz-2024.csv")?;
//!
//! let spec = AggregationSpec::builder(Dimension::Console)
//!     .allow_list(["PS4", "XONE", "PC"])
//!     .measures(Measure::REGIONAL)
//!     .include_total(true)
//!     .sort(SortOrder::Column { column: "total".into(), descending: true })
//!     .build()?;
//!
//! let by_console = GroupedAggregator::aggregate(&result.cleaned, &spec)?;
//! for row in &by_console.rows {
//!     println!("{}: {:?}", row.key, row.values);
//! }
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to customize the run:
//!
//! ```rust,ignore
//! use vgsales_pipeline::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .preview_rows(5000)          // Only the first 5000 raw rows
//!     .outlier_threshold(2.5)      // |z| > 2.5 flags a row
//!     .top_n(20)                   // Publisher/developer ranking length
//!     .build()?;
//! ```

pub mod aggregation;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use aggregation::{AnalysisReport, GroupedAggregator};
pub use cleaner::DataCleaner;
pub use config::{
    AggregationKind, AggregationSpec, AggregationSpecBuilder, ConfigValidationError,
    PipelineConfig, PipelineConfigBuilder, ReferenceLists, SortOrder,
};
pub use error::{PipelineError, Result, ResultExt};
pub use loader::{DatasetLoader, SourceFormat};
pub use pipeline::{OutlierDetector, Pipeline, PipelineBuilder};
pub use profiler::DataProfiler;
pub use types::{
    AggregateRow, AggregateTable, CleanedRecord, CleanedTable, Dimension, Measure, OutlierReport,
    PipelineResult, RecordTable,
};
