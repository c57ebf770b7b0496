//! Statistical analysis algorithms.
//!
//! Provides descriptive statistics, pairwise Pearson correlation and the
//! correlation matrix of an aligned multi-room table.

use super::*;
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Descriptive statistics analyzer
#[derive(Clone)]
pub struct DescriptiveStatsAnalyzer {
    /// Channel to analyze
    pub channel: String,
}

impl Default for DescriptiveStatsAnalyzer {
    fn default() -> Self {
        Self {
            channel: TEMPERATURE_F.to_string(),
        }
    }
}

impl Analyzer for DescriptiveStatsAnalyzer {
    fn id(&self) -> &str {
        "descriptive_stats"
    }

    fn name(&self) -> &str {
        "Descriptive Statistics"
    }

    fn description(&self) -> &str {
        "Computes basic statistics: mean, median, standard deviation, min, max, \
         range, and coefficient of variation for a channel."
    }

    fn category(&self) -> &str {
        "Statistics"
    }

    fn required_channels(&self) -> Vec<&str> {
        vec![&self.channel]
    }

    fn analyze(&self, table: &TimeSeriesTable) -> Result<AnalysisResult, AnalysisError> {
        let data = require_channel(table, &self.channel)?;
        let present: Vec<f64> = data.iter().copied().filter(|v| !v.is_nan()).collect();
        require_min_length(&present, 2)?;

        let (stats, computation_time) = timed_analyze(|| compute_descriptive_stats(&present));

        let mut warnings = vec![];

        if present.len() < data.len() {
            warnings.push(format!(
                "{} missing samples excluded",
                data.len() - present.len()
            ));
        }

        // z-scores keep NaN where the sample is missing
        let z_scores: Vec<f64> = data
            .iter()
            .map(|&x| (x - stats.mean) / stats.stdev.max(0.001))
            .collect();

        Ok(AnalysisResult {
            name: format!("{} Z-Score", self.channel),
            unit: "σ".to_string(),
            values: z_scores,
            metadata: AnalysisMetadata {
                algorithm: "Descriptive Statistics".to_string(),
                parameters: vec![
                    ("mean".to_string(), format!("{:.4}", stats.mean)),
                    ("median".to_string(), format!("{:.4}", stats.median)),
                    ("stdev".to_string(), format!("{:.4}", stats.stdev)),
                    ("min".to_string(), format!("{:.4}", stats.min)),
                    ("max".to_string(), format!("{:.4}", stats.max)),
                    ("range".to_string(), format!("{:.4}", stats.range)),
                    ("cv".to_string(), format!("{:.2}%", stats.cv)),
                    ("n".to_string(), stats.count.to_string()),
                ],
                warnings,
                computation_time_ms: computation_time,
            },
        })
    }

    fn get_config(&self) -> AnalyzerConfig {
        let mut params = HashMap::new();
        params.insert("channel".to_string(), self.channel.clone());

        AnalyzerConfig {
            id: self.id().to_string(),
            name: self.name().to_string(),
            parameters: params,
        }
    }

    fn set_config(&mut self, config: &AnalyzerConfig) {
        if let Some(ch) = config.parameters.get("channel") {
            self.channel = ch.clone();
        }
    }

    fn clone_box(&self) -> Box<dyn Analyzer> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Core statistics implementations
// ============================================================================

/// Container for descriptive statistics
#[derive(Clone, Debug, Default, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub cv: f64, // Coefficient of variation (%)
}

/// Compute descriptive statistics for a dataset
pub fn compute_descriptive_stats(data: &[f64]) -> DescriptiveStats {
    if data.is_empty() {
        return DescriptiveStats::default();
    }

    let n = data.len();

    let mean = data.iter().sum::<f64>() / n as f64;

    // Variance (two-pass for stability)
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1).max(1) as f64;
    let stdev = variance.sqrt();

    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    let cv = if mean.abs() > f64::EPSILON {
        (stdev / mean.abs()) * 100.0
    } else {
        0.0
    };

    DescriptiveStats {
        count: n,
        mean,
        median,
        stdev,
        min,
        max,
        range: max - min,
        cv,
    }
}

/// Compute Pearson correlation coefficient.
///
/// Returns 0 when either series is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom > f64::EPSILON {
        (cov / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

// ============================================================================
// Correlation matrix
// ============================================================================

/// Square, symmetric matrix of pairwise Pearson coefficients
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Coefficient between two named columns
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.values[self.index_of(a)?][self.index_of(b)?])
    }

    /// Coefficients of every column against `name`, in column order
    pub fn column(&self, name: &str) -> Option<Vec<(String, f64)>> {
        let idx = self.index_of(name)?;
        Some(
            self.names
                .iter()
                .zip(&self.values)
                .map(|(n, row)| (n.clone(), row[idx]))
                .collect(),
        )
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        let p = self.len();
        DMatrix::from_fn(p, p, |i, j| self.values[i][j])
    }
}

/// Validate an aligned table and return its columns.
///
/// Fails with `Alignment` when any value is missing or there are fewer than
/// `min_rows` rows, and with `EmptyDataset` when there is nothing to analyze.
pub fn complete_columns(
    table: &TimeSeriesTable,
    min_rows: usize,
) -> Result<Vec<Vec<f64>>, AnalysisError> {
    if table.channels.is_empty() || table.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    if table.data.iter().any(|row| row.len() != table.channels.len()) {
        return Err(AnalysisError::Alignment(
            "rows have differing column counts".to_string(),
        ));
    }
    if table.len() < min_rows {
        return Err(AnalysisError::Alignment(format!(
            "need at least {min_rows} aligned rows, got {}",
            table.len()
        )));
    }

    let columns = table.columns();
    if let Some((name, _)) = table
        .channel_names()
        .into_iter()
        .zip(&columns)
        .find(|(_, col)| col.iter().any(|v| v.is_nan()))
    {
        return Err(AnalysisError::Alignment(format!(
            "column '{name}' has missing values; drop incomplete rows first"
        )));
    }

    Ok(columns)
}

/// Pearson correlation over all columns of an aligned, complete table
pub fn correlate(table: &TimeSeriesTable) -> Result<CorrelationMatrix, AnalysisError> {
    let columns = complete_columns(table, 2)?;
    let names = table.channel_names();
    let p = columns.len();

    for (name, col) in names.iter().zip(&columns) {
        if col.iter().all(|&v| v == col[0]) {
            tracing::warn!("Column '{}' is constant; its correlations are reported as 0", name);
        }
    }

    let mut values = vec![vec![0.0; p]; p];
    for i in 0..p {
        values[i][i] = 1.0;
        for j in (i + 1)..p {
            let r = pearson_correlation(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { names, values })
}
