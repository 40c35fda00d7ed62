//! Configuration types for the pipeline and for grouped aggregation.
//!
//! Both configurations use the builder pattern and are validated on `build()`.

use crate::types::{Dimension, Measure, columns};
use serde::{Deserialize, Serialize};

/// Consoles treated as "popular" by the platform questions.
pub const DEFAULT_POPULAR_CONSOLES: [&str; 16] = [
    "PS", "PS2", "PS3", "PS4", "PS5", "XONE", "X360", "PC", "PSP", "Wii", "DS", "XB", "GBA", "GC",
    "2600", "N64",
];

/// Genres treated as "popular" by the genre questions.
pub const DEFAULT_POPULAR_GENRES: [&str; 14] = [
    "Action",
    "Shooter",
    "Sports",
    "Role-Playing",
    "Adventure",
    "Platform",
    "Puzzle",
    "Simulation",
    "Strategy",
    "Racing",
    "Misc",
    "Fighting",
    "Action-Adventure",
    "Music",
];

/// Allow-lists handed to the canned analytical questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLists {
    pub popular_consoles: Vec<String>,
    pub popular_genres: Vec<String>,
}

impl Default for ReferenceLists {
    fn default() -> Self {
        Self {
            popular_consoles: DEFAULT_POPULAR_CONSOLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            popular_genres: DEFAULT_POPULAR_GENRES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Configuration for the preparation pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use vgsales_pipeline::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .preview_rows(500)
///     .outlier_threshold(2.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Restrict the raw table to its first N rows before cleaning.
    /// Every later stage sees only this population.
    /// Default: None (whole table)
    pub preview_rows: Option<usize>,

    /// Absolute z-score above which a cell marks its row as an outlier.
    /// Default: 3.0
    pub outlier_threshold: f64,

    /// Whether to run the outlier pass at all.
    /// Default: true
    pub detect_outliers: bool,

    /// Popular console and genre allow-lists.
    pub reference_lists: ReferenceLists,

    /// Length of the publisher/developer rankings.
    /// Default: 10
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preview_rows: None,
            outlier_threshold: 3.0,
            detect_outliers: true,
            reference_lists: ReferenceLists::default(),
            top_n: 10,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.preview_rows == Some(0) {
            return Err(ConfigValidationError::InvalidCount {
                field: "preview_rows".to_string(),
                value: 0,
            });
        }

        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidThreshold(self.outlier_threshold));
        }

        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "top_n".to_string(),
                value: 0,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier threshold: {0} (must be a finite value above 0)")]
    InvalidThreshold(f64),

    #[error("Invalid value for '{field}': {value} (must be at least 1)")]
    InvalidCount { field: String, value: usize },

    #[error("Aggregation requires at least one measure")]
    NoMeasures,

    #[error("Measure '{0}' requested more than once")]
    DuplicateMeasure(Measure),

    #[error("A derived total is only defined for sum aggregation")]
    TotalRequiresSum,

    #[error("Cannot sort by '{0}': not an aggregated column")]
    UnknownSortColumn(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    preview_rows: Option<usize>,
    outlier_threshold: Option<f64>,
    detect_outliers: Option<bool>,
    reference_lists: Option<ReferenceLists>,
    top_n: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Truncate the raw table to its first `rows` rows before cleaning.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Set the absolute z-score threshold.
    pub fn outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = Some(threshold);
        self
    }

    /// Enable or disable the outlier pass.
    pub fn detect_outliers(mut self, enable: bool) -> Self {
        self.detect_outliers = Some(enable);
        self
    }

    /// Replace the popular console/genre allow-lists.
    pub fn reference_lists(mut self, lists: ReferenceLists) -> Self {
        self.reference_lists = Some(lists);
        self
    }

    /// Set the ranking length for publishers and developers.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            preview_rows: self.preview_rows,
            outlier_threshold: self.outlier_threshold.unwrap_or(3.0),
            detect_outliers: self.detect_outliers.unwrap_or(true),
            reference_lists: self.reference_lists.unwrap_or_default(),
            top_n: self.top_n.unwrap_or(10),
        };

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Aggregation Configuration
// ============================================================================

/// How measures are combined within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    #[default]
    Sum,
    /// Mean over non-null values in the group.
    Mean,
}

/// Ordering of the groups of an aggregate table.
///
/// Sorting is stable: equal values keep their first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum SortOrder {
    /// Grouping-key encounter order.
    #[default]
    Natural,
    /// By the grouping key itself.
    Key { descending: bool },
    /// By an aggregated column (a measure name or `total`).
    Column { column: String, descending: bool },
}

/// Explicit description of one grouped aggregation.
///
/// # Example
///
/// ```rust,ignore
/// use vgsales_pipeline::config::{AggregationSpec, SortOrder};
/// use vgsales_pipeline::types::{Dimension, Measure};
///
/// let spec = AggregationSpec::builder(Dimension::Console)
///     .measures(Measure::REGIONAL)
///     .include_total(true)
///     .sort(SortOrder::Column { column: "total".into(), descending: true })
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub dimension: Dimension,
    /// Restrict groups to these dimension values.
    pub allow_list: Option<Vec<String>>,
    pub measures: Vec<Measure>,
    pub kind: AggregationKind,
    /// Add a `total` column holding the row-wise sum of the measures.
    pub include_total: bool,
    pub sort: SortOrder,
    /// Keep only the first N groups after sorting.
    pub limit: Option<usize>,
}

impl AggregationSpec {
    pub fn builder(dimension: Dimension) -> AggregationSpecBuilder {
        AggregationSpecBuilder {
            dimension,
            allow_list: None,
            measures: Vec::new(),
            kind: None,
            include_total: None,
            sort: None,
            limit: None,
        }
    }

    /// Names of the value columns this spec produces, in output order.
    pub fn output_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .measures
            .iter()
            .map(|m| m.column().to_string())
            .collect();
        if self.include_total {
            names.push(columns::TOTAL.to_string());
        }
        names
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.measures.is_empty() {
            return Err(ConfigValidationError::NoMeasures);
        }

        for (i, measure) in self.measures.iter().enumerate() {
            if self.measures[..i].contains(measure) {
                return Err(ConfigValidationError::DuplicateMeasure(*measure));
            }
        }

        if self.include_total && self.kind != AggregationKind::Sum {
            return Err(ConfigValidationError::TotalRequiresSum);
        }

        if let SortOrder::Column { column, .. } = &self.sort
            && !self.output_columns().contains(column)
        {
            return Err(ConfigValidationError::UnknownSortColumn(column.clone()));
        }

        if self.limit == Some(0) {
            return Err(ConfigValidationError::InvalidCount {
                field: "limit".to_string(),
                value: 0,
            });
        }

        Ok(())
    }
}

/// Builder for [`AggregationSpec`].
#[derive(Debug)]
pub struct AggregationSpecBuilder {
    dimension: Dimension,
    allow_list: Option<Vec<String>>,
    measures: Vec<Measure>,
    kind: Option<AggregationKind>,
    include_total: Option<bool>,
    sort: Option<SortOrder>,
    limit: Option<usize>,
}

impl AggregationSpecBuilder {
    /// Add a single measure.
    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    /// Add several measures.
    pub fn measures(mut self, measures: impl IntoIterator<Item = Measure>) -> Self {
        self.measures.extend(measures);
        self
    }

    /// Restrict groups to the given dimension values.
    pub fn allow_list<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn kind(mut self, kind: AggregationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn include_total(mut self, include: bool) -> Self {
        self.include_total = Some(include);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<AggregationSpec, ConfigValidationError> {
        let spec = AggregationSpec {
            dimension: self.dimension,
            allow_list: self.allow_list,
            measures: self.measures,
            kind: self.kind.unwrap_or_default(),
            include_total: self.include_total.unwrap_or(false),
            sort: self.sort.unwrap_or_default(),
            limit: self.limit,
        };

        spec.validate()?;
        Ok(spec)
    }
}
