use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Pipeline Stages
// ============================================================================

/// The cleansing stages, in the order they hand files to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Null normalization, sparse-column and incomplete-row removal.
    MissingValues,
    /// Alternative to row removal: mean, median and interpolated fills.
    Imputation,
    /// Timestamp split, dedup, continuity and precision normalization.
    Cleansing,
    /// Physical-range, order-sign and date-window filtering.
    OutlierFiltering,
}

impl PipelineStage {
    /// Get a human-readable display name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MissingValues => "Missing-Value Resolution",
            Self::Imputation => "Imputation Variants",
            Self::Cleansing => "Structural Cleansing",
            Self::OutlierFiltering => "Outlier Filtering",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Stage Report
// ============================================================================

/// What a single stage did to its input.
///
/// Every stage returns one of these next to its output frame. Data-quality
/// problems that do not abort the stage end up in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage that produced this report.
    pub stage: PipelineStage,
    /// File the stage read, when run through a file handoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    /// Files the stage wrote.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_files: Vec<String>,

    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    /// Percentage of non-missing cells in the input (missing-value stages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,

    /// Timestamps that could not be parsed (cleansing stage).
    #[serde(default)]
    pub timestamp_parse_failures: usize,

    /// Entities dropped for failing the continuity check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_entities: Vec<String>,

    /// Rows removed per filter, in application order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_outcomes: Vec<FilterOutcome>,

    /// Per-column summaries of changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_summaries: Vec<ColumnSummary>,

    /// List of actions taken.
    pub actions: Vec<PreprocessingAction>,

    /// Warnings and notes generated while running.
    pub warnings: Vec<String>,
}

impl StageReport {
    /// Create an empty report for `stage`.
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            stage,
            input_file: None,
            output_files: Vec::new(),
            duration_ms: 0,
            rows_before: 0,
            rows_after: 0,
            columns_before: 0,
            columns_after: 0,
            completeness: None,
            timestamp_parse_failures: 0,
            dropped_entities: Vec::new(),
            filter_outcomes: Vec::new(),
            column_summaries: Vec::new(),
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record the input shape.
    pub fn with_input_shape(mut self, (rows, columns): (usize, usize)) -> Self {
        self.rows_before = rows;
        self.columns_before = columns;
        self
    }

    /// Record the output shape.
    pub fn set_output_shape(&mut self, (rows, columns): (usize, usize)) {
        self.rows_after = rows;
        self.columns_after = columns;
    }

    /// Add an action to the report.
    pub fn add_action(&mut self, action: PreprocessingAction) {
        self.actions.push(action);
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn columns_removed(&self) -> usize {
        self.columns_before.saturating_sub(self.columns_after)
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f64 / self.rows_before as f64) * 100.0
        }
    }
}

/// Rows removed by one outlier filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Filter name, e.g. `humidity`.
    pub filter: String,
    /// Rows removed by this filter.
    pub rows_removed: usize,
    /// True when the filter could not run (e.g. `Date` absent).
    #[serde(default)]
    pub skipped: bool,
}

// ============================================================================
// Actions
// ============================================================================

/// A single action taken during a stage.
///
/// Actions are logged throughout the pipeline execution to provide
/// an audit trail of what was done to the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Target of the action (column name or "dataset").
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Additional details (e.g., threshold, strategy used).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PreprocessingAction {
    /// Create a new preprocessing action.
    pub fn new(action_type: ActionType, target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    /// Add details to the action.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions that can be taken during a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was removed from the dataset.
    ColumnRemoved,
    /// One or more rows were removed from the dataset.
    RowsRemoved,
    /// A column's data type was corrected.
    TypeCorrected,
    /// Null markers were normalized to real nulls.
    ValueCleaned,
    /// Missing values were imputed.
    ValueImputed,
    /// A timestamp column was split into date and time.
    TimestampSplit,
    /// Same-day duplicate records were removed.
    DuplicatesRemoved,
    /// Whole entities were removed for breaking continuity.
    EntitiesRemoved,
    /// Numeric values were rounded.
    ValuesRounded,
    /// Rows outside a physical or temporal range were removed.
    OutlierRemoved,
    /// Rows were reordered.
    RowsSorted,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRemoved => "Column Removed",
            Self::RowsRemoved => "Rows Removed",
            Self::TypeCorrected => "Type Corrected",
            Self::ValueCleaned => "Value Cleaned",
            Self::ValueImputed => "Value Imputed",
            Self::TimestampSplit => "Timestamp Split",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::EntitiesRemoved => "Entities Removed",
            Self::ValuesRounded => "Values Rounded",
            Self::OutlierRemoved => "Outlier Removed",
            Self::RowsSorted => "Rows Sorted",
        }
    }
}

// ============================================================================
// Column Summaries
// ============================================================================

/// Summary of changes made to a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Name of the column.
    pub name: String,
    /// Data type as read (as string).
    pub original_type: String,
    /// Number of missing values after null normalization.
    pub missing_count: usize,
    /// Missing values as a percentage of rows.
    pub missing_percentage: f64,
    /// Imputation method used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imputation_method: Option<String>,
    /// Whether the column was removed.
    pub was_removed: bool,
    /// Reason for removal, if removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_reason: Option<String>,
}

impl ColumnSummary {
    /// Create a new column summary.
    pub fn new(name: impl Into<String>, original_type: impl Into<String>, missing_count: usize, rows: usize) -> Self {
        let missing_percentage = if rows == 0 {
            0.0
        } else {
            missing_count as f64 / rows as f64 * 100.0
        };
        Self {
            name: name.into(),
            original_type: original_type.into(),
            missing_count,
            missing_percentage,
            imputation_method: None,
            was_removed: false,
            removal_reason: None,
        }
    }

    /// Mark the column as removed with a reason.
    pub fn mark_removed(mut self, reason: impl Into<String>) -> Self {
        self.was_removed = true;
        self.removal_reason = Some(reason.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
