//! Analysis algorithms for building climate logs.
//!
//! Every analysis is a pure function over an immutable [`TimeSeriesTable`].
//! The per-channel analyses (bounds, swing, dew point, descriptive
//! statistics) are additionally wrapped in [`Analyzer`] implementations so
//! callers can discover them by channel availability and drive them from a
//! serializable [`AnalyzerConfig`].
//!
//! Multi-room analyses (correlation, suitability, factor extraction) work on
//! aligned tables produced by [`resample::align`].

pub mod bounds;
pub mod derived;
pub mod factor;
pub mod filters;
pub mod resample;
pub mod statistics;
pub mod suitability;
pub mod swing;

use crate::parsers::types::{ChannelKind, TimeSeriesTable, DEW_POINT_F, RELATIVE_HUMIDITY_PCT, TEMPERATURE_F};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use strum::{EnumString, VariantArray};
use thiserror::Error;

/// Errors that can occur during analysis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The (possibly filtered) table has no rows
    #[error("Dataset is empty")]
    EmptyDataset,
    /// Factor count outside `1..variables`
    #[error("Invalid factor count: requested {requested}, must be at least 1 and less than {variables}")]
    InvalidFactorCount { requested: usize, variables: usize },
    /// Columns are not aligned or contain missing values
    #[error("Alignment error: {0}")]
    Alignment(String),
    /// A required channel is missing from the table
    #[error("Missing required channel: {0}")]
    MissingChannel(String),
    /// Not enough data points for the analysis
    #[error("Insufficient data: need {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },
    /// Invalid parameter configuration
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Numerical failure (singular matrix, non-convergence)
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Measured quantity selected for bounds and swing analysis
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, VariantArray, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Parameter {
    #[strum(serialize = "temperature", serialize = "temp", serialize = "t")]
    Temperature,
    #[strum(serialize = "relative_humidity", serialize = "rh", serialize = "humidity")]
    RelativeHumidity,
    #[strum(serialize = "dew_point", serialize = "dp", serialize = "dewpoint")]
    DewPoint,
}

impl Parameter {
    /// Canonical channel name carrying this parameter
    pub fn channel(&self) -> &'static str {
        match self {
            Parameter::Temperature => TEMPERATURE_F,
            Parameter::RelativeHumidity => RELATIVE_HUMIDITY_PCT,
            Parameter::DewPoint => DEW_POINT_F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::RelativeHumidity => "relative_humidity",
            Parameter::DewPoint => "dew_point",
        }
    }

    pub fn unit(&self) -> &'static str {
        self.kind().unit()
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Parameter::Temperature => ChannelKind::Temperature,
            Parameter::RelativeHumidity => ChannelKind::RelativeHumidity,
            Parameter::DewPoint => ChannelKind::DewPoint,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about analysis results
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisMetadata {
    /// Name of the algorithm used
    pub algorithm: String,
    /// Key parameters and their values
    pub parameters: Vec<(String, String)>,
    /// Warning messages about the analysis
    pub warnings: Vec<String>,
    /// Time taken for computation in milliseconds
    pub computation_time_ms: u64,
}

/// Result of an analysis operation
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    /// Name for the result (used as channel name if added)
    pub name: String,
    /// Unit for the result values
    pub unit: String,
    /// The computed values (one per timestamp)
    pub values: Vec<f64>,
    /// Metadata about the analysis
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Create a new analysis result
    pub fn new(name: impl Into<String>, unit: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            values,
            metadata: AnalysisMetadata::default(),
        }
    }

    /// Add metadata to the result
    pub fn with_metadata(mut self, metadata: AnalysisMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check if the analysis produced any warnings
    pub fn has_warnings(&self) -> bool {
        !self.metadata.warnings.is_empty()
    }

    /// Look up a reported parameter by key
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.metadata
            .parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Configuration for an analyzer that can be serialized
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Unique identifier for the analyzer
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Parameter values as key-value pairs
    pub parameters: HashMap<String, String>,
}

/// Core trait for all analysis algorithms
pub trait Analyzer: Send + Sync {
    /// Unique identifier for this analyzer
    fn id(&self) -> &str;

    /// Human-readable algorithm name
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Category for grouping (e.g., "Comfort", "Derived", "Statistics")
    fn category(&self) -> &str;

    /// List of required channel names
    fn required_channels(&self) -> Vec<&str>;

    /// Optional channels that enhance analysis if present
    fn optional_channels(&self) -> Vec<&str> {
        vec![]
    }

    /// Execute analysis on a table
    fn analyze(&self, table: &TimeSeriesTable) -> Result<AnalysisResult, AnalysisError>;

    /// Get current configuration
    fn get_config(&self) -> AnalyzerConfig;

    /// Apply configuration
    fn set_config(&mut self, config: &AnalyzerConfig);

    /// Clone into a boxed trait object
    fn clone_box(&self) -> Box<dyn Analyzer>;
}

impl Clone for Box<dyn Analyzer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Registry of available analyzers
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Create a new registry with default analyzers
    pub fn new() -> Self {
        let mut registry = Self {
            analyzers: Vec::new(),
        };

        registry.register_defaults();

        registry
    }

    fn register_defaults(&mut self) {
        // Comfort
        self.register(Box::new(bounds::BoundsAnalyzer::default()));
        self.register(Box::new(swing::SwingAnalyzer::default()));

        // Derived Calculations
        self.register(Box::new(derived::DewPointCalculator::default()));

        // Statistics
        self.register(Box::new(statistics::DescriptiveStatsAnalyzer::default()));
    }

    /// Register a new analyzer
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    /// Get all registered analyzers
    pub fn all(&self) -> &[Box<dyn Analyzer>] {
        &self.analyzers
    }

    /// Get analyzers available for the given table
    pub fn available_for(&self, table: &TimeSeriesTable) -> Vec<&dyn Analyzer> {
        self.analyzers
            .iter()
            .filter(|a| a.required_channels().iter().all(|ch| table.has_channel(ch)))
            .map(|a| a.as_ref())
            .collect()
    }

    /// Get analyzers by category
    pub fn by_category(&self) -> HashMap<String, Vec<&dyn Analyzer>> {
        let mut categories: HashMap<String, Vec<&dyn Analyzer>> = HashMap::new();

        for analyzer in &self.analyzers {
            categories
                .entry(analyzer.category().to_string())
                .or_default()
                .push(analyzer.as_ref());
        }

        categories
    }

    /// Find an analyzer by ID
    pub fn find_by_id(&self, id: &str) -> Option<&dyn Analyzer> {
        self.analyzers
            .iter()
            .find(|a| a.id() == id)
            .map(|a| a.as_ref())
    }

    /// Find an analyzer by ID and return a mutable reference
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Box<dyn Analyzer>> {
        self.analyzers.iter_mut().find(|a| a.id() == id)
    }
}

/// Helper function to measure analysis execution time
pub fn timed_analyze<F, T>(f: F) -> (T, u64)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed().as_millis() as u64;
    (result, elapsed)
}

/// Helper to get a required channel or return an error
pub fn require_channel(table: &TimeSeriesTable, name: &str) -> Result<Vec<f64>, AnalysisError> {
    table
        .channel_values(name)
        .ok_or_else(|| AnalysisError::MissingChannel(name.to_string()))
}

/// Helper to check minimum data length
pub fn require_min_length(data: &[f64], min_len: usize) -> Result<(), AnalysisError> {
    if data.len() < min_len {
        Err(AnalysisError::InsufficientData {
            needed: min_len,
            got: data.len(),
        })
    } else {
        Ok(())
    }
}

pub fn require_non_empty(table: &TimeSeriesTable) -> Result<(), AnalysisError> {
    if table.is_empty() {
        Err(AnalysisError::EmptyDataset)
    } else {
        Ok(())
    }
}

/// Parse a numeric config parameter, leaving `target` untouched when absent or invalid
pub(crate) fn apply_param<T: std::str::FromStr>(
    params: &HashMap<String, String>,
    key: &str,
    target: &mut T,
) {
    if let Some(v) = params.get(key).and_then(|s| s.parse().ok()) {
        *target = v;
    }
}
