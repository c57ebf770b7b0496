//! Rolling 24-hour swing (max - min) of a channel.
//!
//! The swing at index `k` is the range of the `window` samples starting at
//! `k`. Ranges are computed in O(n) with a pair of monotonic deques.

use super::*;
use super::filters::group_by_month;
use chrono::NaiveDateTime;
use std::collections::VecDeque;
use strum::AsRefStr;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Handling of trailing indices that cannot complete a window
#[derive(AsRefStr, Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SwingTailPolicy {
    /// One entry per input sample; the last `window` entries are 0
    #[default]
    ZeroFill,
    /// Only indices whose window is complete
    Truncate,
}

/// Number of samples in a 24-hour window at the given sample period
pub fn window_samples(period_minutes: f64) -> Result<usize, AnalysisError> {
    if !(period_minutes > 0.0 && period_minutes <= MINUTES_PER_DAY) {
        return Err(AnalysisError::InvalidParameter(format!(
            "sample period must be in (0, 1440] minutes, got {period_minutes}"
        )));
    }
    Ok((MINUTES_PER_DAY / period_minutes).round() as usize)
}

/// Range (max - min) of every complete window of `data`.
///
/// Returns `data.len() - window + 1` values, or none when `data` is shorter
/// than the window.
pub fn sliding_range(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || data.len() < window {
        return vec![];
    }

    let mut max_q: VecDeque<usize> = VecDeque::with_capacity(window);
    let mut min_q: VecDeque<usize> = VecDeque::with_capacity(window);
    let mut ranges = Vec::with_capacity(data.len() - window + 1);

    for (i, &v) in data.iter().enumerate() {
        while max_q.back().is_some_and(|&j| data[j] <= v) {
            max_q.pop_back();
        }
        max_q.push_back(i);

        while min_q.back().is_some_and(|&j| data[j] >= v) {
            min_q.pop_back();
        }
        min_q.push_back(i);

        if i + 1 >= window {
            let start = i + 1 - window;
            while max_q.front().is_some_and(|&j| j < start) {
                max_q.pop_front();
            }
            while min_q.front().is_some_and(|&j| j < start) {
                min_q.pop_front();
            }
            if let (Some(&hi), Some(&lo)) = (max_q.front(), min_q.front()) {
                ranges.push(data[hi] - data[lo]);
            }
        }
    }

    ranges
}

/// Swing values with the timestamp of each window start
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwingSeries {
    pub times: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
    pub window: usize,
    pub policy: SwingTailPolicy,
}

impl SwingSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_swing(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Count of entries `>= threshold`, tail included
    pub fn violations(&self, threshold: f64) -> usize {
        self.values.iter().filter(|&&v| v >= threshold).count()
    }
}

/// Rolling swing of `field` and the number of entries `>= threshold`.
pub fn analyze_swing(
    table: &TimeSeriesTable,
    field: &str,
    window: usize,
    threshold: f64,
    policy: SwingTailPolicy,
) -> Result<(SwingSeries, usize), AnalysisError> {
    require_non_empty(table)?;
    if window == 0 {
        return Err(AnalysisError::InvalidParameter(
            "swing window must be at least one sample".to_string(),
        ));
    }

    let data = require_channel(table, field)?;
    if data.iter().any(|v| v.is_nan()) {
        return Err(AnalysisError::Alignment(format!(
            "column '{field}' has missing values"
        )));
    }

    let n = data.len();
    let ranges = sliding_range(&data, window);

    let (times, values) = match policy {
        SwingTailPolicy::ZeroFill => {
            let valid = n.saturating_sub(window);
            let mut values = vec![0.0; n];
            values[..valid].copy_from_slice(&ranges[..valid]);
            (table.times.clone(), values)
        }
        SwingTailPolicy::Truncate => (table.times[..ranges.len()].to_vec(), ranges),
    };

    if n <= window {
        tracing::debug!(
            "Swing window of {} samples exceeds the {} available rows",
            window,
            n
        );
    }

    let series = SwingSeries {
        times,
        values,
        window,
        policy,
    };
    let violations = series.violations(threshold);
    Ok((series, violations))
}

/// Headline swing figures for one room
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwingSummary {
    pub max_swing: f64,
    pub violation_count: usize,
    pub violation_fraction: f64,
    pub threshold: f64,
    pub window: usize,
}

impl SwingSummary {
    pub fn from_series(series: &SwingSeries, threshold: f64) -> Self {
        let violation_count = series.violations(threshold);
        Self {
            max_swing: series.max_swing(),
            violation_count,
            violation_fraction: if series.is_empty() {
                0.0
            } else {
                violation_count as f64 / series.len() as f64
            },
            threshold,
            window: series.window,
        }
    }

    /// Whether the room exceeds the threshold (max swing at 2 decimals)
    pub fn fails(&self) -> bool {
        (self.max_swing * 100.0).round() / 100.0 > self.threshold
    }
}

/// Share of 24-hour windows whose swing meets the threshold in one month
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlySwingRow {
    pub year: i32,
    pub month: u32,
    pub percent_violating: f64,
    pub samples: usize,
}

/// Per (year, month) percentage of swing entries `>= threshold`
pub fn monthly_swing_breakdown(
    table: &TimeSeriesTable,
    field: &str,
    window: usize,
    threshold: f64,
) -> Result<Vec<MonthlySwingRow>, AnalysisError> {
    let (series, _) = analyze_swing(table, field, window, threshold, SwingTailPolicy::ZeroFill)?;

    Ok(group_by_month(&series.times, &series.values)
        .into_iter()
        .map(|((year, month), swings)| MonthlySwingRow {
            year,
            month,
            percent_violating: 100.0 * swings.iter().filter(|&&v| v >= threshold).count() as f64
                / swings.len() as f64,
            samples: swings.len(),
        })
        .collect())
}

// ============================================================================
// Swing Analyzer
// ============================================================================

/// 24-hour swing analyzer
#[derive(Clone)]
pub struct SwingAnalyzer {
    pub parameter: Parameter,
    pub threshold: f64,
    /// Used when the period cannot be inferred from the table
    pub sample_period_minutes: f64,
    pub tail_policy: SwingTailPolicy,
}

impl Default for SwingAnalyzer {
    fn default() -> Self {
        Self {
            parameter: Parameter::Temperature,
            threshold: 10.0,
            sample_period_minutes: 15.0,
            tail_policy: SwingTailPolicy::ZeroFill,
        }
    }
}

impl Analyzer for SwingAnalyzer {
    fn id(&self) -> &str {
        "swing"
    }

    fn name(&self) -> &str {
        "24-Hour Swing"
    }

    fn description(&self) -> &str {
        "Computes the rolling 24-hour range of a parameter and counts the \
         windows whose swing meets or exceeds the threshold."
    }

    fn category(&self) -> &str {
        "Comfort"
    }

    fn required_channels(&self) -> Vec<&str> {
        vec![self.parameter.channel()]
    }

    fn analyze(&self, table: &TimeSeriesTable) -> Result<AnalysisResult, AnalysisError> {
        let period = table
            .sample_period_minutes()
            .unwrap_or(self.sample_period_minutes);
        let window = window_samples(period)?;

        let (result, computation_time) = timed_analyze(|| {
            analyze_swing(
                table,
                self.parameter.channel(),
                window,
                self.threshold,
                self.tail_policy,
            )
        });
        let (series, violations) = result?;
        let summary = SwingSummary::from_series(&series, self.threshold);

        let mut warnings = vec![];
        if table.len() <= window {
            warnings.push(format!(
                "Log covers fewer than {} samples; no complete 24-hour window",
                window + 1
            ));
        }
        if (period - self.sample_period_minutes).abs() > f64::EPSILON {
            warnings.push(format!(
                "Sample period inferred as {:.1} min (configured {:.1} min)",
                period, self.sample_period_minutes
            ));
        }

        Ok(AnalysisResult {
            name: format!("{} 24h Swing", self.parameter),
            unit: self.parameter.unit().to_string(),
            values: series.values,
            metadata: AnalysisMetadata {
                algorithm: "Monotonic deque sliding range".to_string(),
                parameters: vec![
                    ("window_samples".to_string(), window.to_string()),
                    ("threshold".to_string(), format!("{:.2}", self.threshold)),
                    ("max_swing".to_string(), format!("{:.2}", summary.max_swing)),
                    ("violations".to_string(), violations.to_string()),
                    (
                        "violation_fraction".to_string(),
                        format!("{:.4}", summary.violation_fraction),
                    ),
                ],
                warnings,
                computation_time_ms: computation_time,
            },
        })
    }

    fn get_config(&self) -> AnalyzerConfig {
        let mut params = HashMap::new();
        params.insert("parameter".to_string(), self.parameter.to_string());
        params.insert("threshold".to_string(), self.threshold.to_string());
        params.insert(
            "sample_period_minutes".to_string(),
            self.sample_period_minutes.to_string(),
        );
        params.insert("tail_policy".to_string(), self.tail_policy.as_ref().to_string());

        AnalyzerConfig {
            id: self.id().to_string(),
            name: self.name().to_string(),
            parameters: params,
        }
    }

    fn set_config(&mut self, config: &AnalyzerConfig) {
        apply_param(&config.parameters, "parameter", &mut self.parameter);
        apply_param(&config.parameters, "threshold", &mut self.threshold);
        apply_param(
            &config.parameters,
            "sample_period_minutes",
            &mut self.sample_period_minutes,
        );
        apply_param(&config.parameters, "tail_policy", &mut self.tail_policy);
    }

    fn clone_box(&self) -> Box<dyn Analyzer> {
        Box::new(self.clone())
    }
}
