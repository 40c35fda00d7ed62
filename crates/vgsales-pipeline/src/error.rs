//! Error types for the sales dataset pipeline.
//!
//! All fallible library operations return [`PipelineError`]. Errors carry a
//! stable machine-readable code and serialize as `{ code, message }` so the
//! CLI can report them in JSON mode.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file does not exist.
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    /// File extension is not one of the supported tabular formats.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// The reader failed to produce a table from the source.
    #[error("Failed to load dataset: {0}")]
    LoadFailed(String),

    /// Required columns are absent from the source header.
    #[error("Dataset is missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// Column was not found in a table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Configuration builder validation failed.
    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    /// Grouped aggregation failed.
    #[error("Failed to aggregate by '{dimension}': {reason}")]
    AggregationFailed { dimension: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::LoadFailed(_) => "LOAD_ERROR",
            Self::MissingColumns { .. } => "SCHEMA_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Config(_) => "INVALID_CONFIG",
            Self::AggregationFailed { .. } => "AGGREGATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error belongs to the fatal load/schema class.
    ///
    /// These stop the pipeline before any cleaning takes place.
    pub fn is_fatal_load(&self) -> bool {
        match self {
            Self::FileNotFound(_)
            | Self::UnsupportedFormat(_)
            | Self::LoadFailed(_)
            | Self::MissingColumns { .. } => true,
            Self::WithContext { source, .. } => source.is_fatal_load(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}
