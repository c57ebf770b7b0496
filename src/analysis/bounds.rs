//! Out-of-bounds statistics for a single channel.
//!
//! Fractions are inclusive (`value <= lower`, `value >= upper`); the category
//! uses strict comparisons on the extremes.

use super::*;
use super::filters::group_by_month;
use strum::AsRefStr;

/// Overall classification of a series against its bounds
#[derive(AsRefStr, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsCategory {
    BothViolating,
    OverOnly,
    UnderOnly,
    WithinBounds,
}

/// Which category wins when a series violates both bounds
#[derive(AsRefStr, Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CategoryPrecedence {
    #[default]
    BothFirst,
    OverFirst,
    UnderFirst,
}

impl BoundsCategory {
    pub fn classify(min: f64, max: f64, lower: f64, upper: f64, precedence: CategoryPrecedence) -> Self {
        let over = max > upper;
        let under = min < lower;
        match (over, under, precedence) {
            (true, true, CategoryPrecedence::BothFirst) => BoundsCategory::BothViolating,
            (true, true, CategoryPrecedence::UnderFirst) => BoundsCategory::UnderOnly,
            (true, _, _) => BoundsCategory::OverOnly,
            (false, true, _) => BoundsCategory::UnderOnly,
            (false, false, _) => BoundsCategory::WithinBounds,
        }
    }
}

/// Bounds statistics for one channel
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundsResult {
    pub lower: f64,
    pub upper: f64,
    pub min: f64,
    pub max: f64,
    /// Fraction of samples `<= lower`
    pub fraction_below_min: f64,
    /// Fraction of samples `>= upper`
    pub fraction_above_max: f64,
    /// Number of non-missing samples
    pub count: usize,
    pub category: BoundsCategory,
}

/// Bounds statistics with the default category precedence
pub fn analyze_bounds(
    table: &TimeSeriesTable,
    field: &str,
    lower: f64,
    upper: f64,
) -> Result<BoundsResult, AnalysisError> {
    analyze_bounds_with(table, field, lower, upper, CategoryPrecedence::default())
}

pub fn analyze_bounds_with(
    table: &TimeSeriesTable,
    field: &str,
    lower: f64,
    upper: f64,
    precedence: CategoryPrecedence,
) -> Result<BoundsResult, AnalysisError> {
    require_non_empty(table)?;
    let values: Vec<f64> = require_channel(table, field)?
        .into_iter()
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    if lower > upper {
        tracing::warn!("Lower bound {} is above upper bound {}", lower, upper);
    }

    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let below = values.iter().filter(|&&v| v <= lower).count();
    let above = values.iter().filter(|&&v| v >= upper).count();

    Ok(BoundsResult {
        lower,
        upper,
        min,
        max,
        fraction_below_min: below as f64 / n,
        fraction_above_max: above as f64 / n,
        count: values.len(),
        category: BoundsCategory::classify(min, max, lower, upper, precedence),
    })
}

/// Share of samples under/over the bounds in one calendar month
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyBoundsRow {
    pub year: i32,
    pub month: u32,
    pub percent_under: f64,
    pub percent_over: f64,
    pub samples: usize,
}

/// Per (year, month) percentages of samples `<= lower` and `>= upper`
pub fn monthly_bounds_breakdown(
    table: &TimeSeriesTable,
    field: &str,
    lower: f64,
    upper: f64,
) -> Result<Vec<MonthlyBoundsRow>, AnalysisError> {
    require_non_empty(table)?;
    let values = require_channel(table, field)?;

    Ok(group_by_month(&table.times, &values)
        .into_iter()
        .map(|((year, month), samples)| {
            let n = samples.len() as f64;
            MonthlyBoundsRow {
                year,
                month,
                percent_under: 100.0 * samples.iter().filter(|&&v| v <= lower).count() as f64 / n,
                percent_over: 100.0 * samples.iter().filter(|&&v| v >= upper).count() as f64 / n,
                samples: samples.len(),
            }
        })
        .collect())
}

// ============================================================================
// Bounds Analyzer
// ============================================================================

/// Per-sample bounds classification: -1 at or below `lower`, +1 at or above
/// `upper`, 0 within.
#[derive(Clone)]
pub struct BoundsAnalyzer {
    pub parameter: Parameter,
    pub lower: f64,
    pub upper: f64,
    pub precedence: CategoryPrecedence,
}

impl Default for BoundsAnalyzer {
    fn default() -> Self {
        Self {
            parameter: Parameter::Temperature,
            lower: 63.0,
            upper: 74.0,
            precedence: CategoryPrecedence::default(),
        }
    }
}

impl Analyzer for BoundsAnalyzer {
    fn id(&self) -> &str {
        "bounds"
    }

    fn name(&self) -> &str {
        "Out of Bounds"
    }

    fn description(&self) -> &str {
        "Measures how much of the time a parameter spends at or beyond its \
         lower and upper limits, and classifies the room accordingly."
    }

    fn category(&self) -> &str {
        "Comfort"
    }

    fn required_channels(&self) -> Vec<&str> {
        vec![self.parameter.channel()]
    }

    fn analyze(&self, table: &TimeSeriesTable) -> Result<AnalysisResult, AnalysisError> {
        let channel = self.parameter.channel();
        let data = require_channel(table, channel)?;

        let (result, computation_time) = timed_analyze(|| {
            analyze_bounds_with(table, channel, self.lower, self.upper, self.precedence)
        });
        let result = result?;

        let flags: Vec<f64> = data
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    f64::NAN
                } else if v <= self.lower {
                    -1.0
                } else if v >= self.upper {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let mut warnings = vec![];
        if result.count < data.len() {
            warnings.push(format!(
                "{} missing samples excluded",
                data.len() - result.count
            ));
        }

        Ok(AnalysisResult {
            name: format!("{} Bounds", self.parameter),
            unit: String::new(),
            values: flags,
            metadata: AnalysisMetadata {
                algorithm: "Inclusive bounds count".to_string(),
                parameters: vec![
                    ("lower".to_string(), format!("{:.2}", self.lower)),
                    ("upper".to_string(), format!("{:.2}", self.upper)),
                    ("min".to_string(), format!("{:.2}", result.min)),
                    ("max".to_string(), format!("{:.2}", result.max)),
                    (
                        "fraction_below_min".to_string(),
                        format!("{:.4}", result.fraction_below_min),
                    ),
                    (
                        "fraction_above_max".to_string(),
                        format!("{:.4}", result.fraction_above_max),
                    ),
                    ("category".to_string(), result.category.as_ref().to_string()),
                ],
                warnings,
                computation_time_ms: computation_time,
            },
        })
    }

    fn get_config(&self) -> AnalyzerConfig {
        let mut params = HashMap::new();
        params.insert("parameter".to_string(), self.parameter.to_string());
        params.insert("lower".to_string(), self.lower.to_string());
        params.insert("upper".to_string(), self.upper.to_string());
        params.insert("precedence".to_string(), self.precedence.as_ref().to_string());

        AnalyzerConfig {
            id: self.id().to_string(),
            name: self.name().to_string(),
            parameters: params,
        }
    }

    fn set_config(&mut self, config: &AnalyzerConfig) {
        apply_param(&config.parameters, "parameter", &mut self.parameter);
        apply_param(&config.parameters, "lower", &mut self.lower);
        apply_param(&config.parameters, "upper", &mut self.upper);
        apply_param(&config.parameters, "precedence", &mut self.precedence);
    }

    fn clone_box(&self) -> Box<dyn Analyzer> {
        Box::new(self.clone())
    }
}
