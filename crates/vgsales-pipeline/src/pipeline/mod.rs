//! Pipeline module.
//!
//! This module provides the main pipeline and the outlier pass it runs.

mod builder;
pub mod outliers;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::OutlierDetector;
