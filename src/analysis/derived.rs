//! Derived psychrometric quantities.
//!
//! Dew point is computed with the Magnus-type approximation
//!
//! ```text
//! Td(°C) = (RH/100)^(1/8) * (112 + 0.9*T) + 0.1*T - 112
//! ```
//!
//! where `T` is the dry-bulb temperature in °C. Inputs and outputs are in °F.

use super::{
    require_channel, require_min_length, timed_analyze, AnalysisError, AnalysisMetadata,
    AnalysisResult, Analyzer, AnalyzerConfig,
};
use crate::parsers::types::{
    Channel, ChannelKind, TimeSeriesTable, DEW_POINT_F, RELATIVE_HUMIDITY_PCT, TEMPERATURE_F,
};
use crate::units::{celsius_to_fahrenheit, fahrenheit_to_celsius};
use std::collections::HashMap;

/// Dew point in °F from dry-bulb temperature (°F) and relative humidity (%).
///
/// RH of 0 yields a defined (very low) value. Missing inputs yield NaN.
pub fn dew_point_f(temp_f: f64, rh_pct: f64) -> f64 {
    let t_c = fahrenheit_to_celsius(temp_f);
    let td_c = (rh_pct / 100.0).powf(1.0 / 8.0) * (112.0 + 0.9 * t_c) + 0.1 * t_c - 112.0;
    celsius_to_fahrenheit(td_c)
}

/// Element-wise dew point over paired temperature/humidity series
pub fn dew_point_series(temp_f: &[f64], rh_pct: &[f64]) -> Vec<f64> {
    temp_f
        .iter()
        .zip(rh_pct)
        .map(|(&t, &rh)| dew_point_f(t, rh))
        .collect()
}

/// New table with an added `dew_point_f` channel.
///
/// A table that already carries dew point is returned as a copy.
pub fn with_dew_point(table: &TimeSeriesTable) -> Result<TimeSeriesTable, AnalysisError> {
    if table.has_channel(DEW_POINT_F) {
        return Ok(table.clone());
    }

    let temp = require_channel(table, TEMPERATURE_F)?;
    let rh = require_channel(table, RELATIVE_HUMIDITY_PCT)?;

    Ok(table.with_channel(
        Channel::new(DEW_POINT_F, ChannelKind::DewPoint),
        &dew_point_series(&temp, &rh),
    ))
}

// ============================================================================
// Dew Point Calculator
// ============================================================================

/// Dew point analyzer producing one value per sample
#[derive(Clone)]
pub struct DewPointCalculator {
    pub temperature_channel: String,
    pub humidity_channel: String,
    /// Warn when the mean dew point exceeds this value (°F)
    pub condensation_warning_f: f64,
}

impl Default for DewPointCalculator {
    fn default() -> Self {
        Self {
            temperature_channel: TEMPERATURE_F.to_string(),
            humidity_channel: RELATIVE_HUMIDITY_PCT.to_string(),
            condensation_warning_f: 56.0,
        }
    }
}

impl Analyzer for DewPointCalculator {
    fn id(&self) -> &str {
        "dew_point"
    }

    fn name(&self) -> &str {
        "Dew Point"
    }

    fn description(&self) -> &str {
        "Computes dew point from dry-bulb temperature and relative humidity. \
         High dew points indicate a risk of condensation on cold surfaces."
    }

    fn category(&self) -> &str {
        "Derived"
    }

    fn required_channels(&self) -> Vec<&str> {
        vec![&self.temperature_channel, &self.humidity_channel]
    }

    fn analyze(&self, table: &TimeSeriesTable) -> Result<AnalysisResult, AnalysisError> {
        let temp = require_channel(table, &self.temperature_channel)?;
        let rh = require_channel(table, &self.humidity_channel)?;
        require_min_length(&temp, 1)?;

        let (dew_points, computation_time) = timed_analyze(|| dew_point_series(&temp, &rh));

        let stats = super::statistics::compute_descriptive_stats(&dew_points);

        let mut warnings = vec![];
        if rh.iter().any(|&v| !(0.0..=100.0).contains(&v)) {
            warnings.push("Relative humidity outside 0-100% - check sensor calibration".to_string());
        }
        if stats.max > self.condensation_warning_f {
            warnings.push(format!(
                "Dew point reached {:.1}°F - condensation risk on surfaces below this temperature",
                stats.max
            ));
        }

        Ok(AnalysisResult {
            name: "Dew Point".to_string(),
            unit: "°F".to_string(),
            values: dew_points,
            metadata: AnalysisMetadata {
                algorithm: "Magnus approximation".to_string(),
                parameters: vec![
                    ("mean_dew_point".to_string(), format!("{:.2}", stats.mean)),
                    ("min_dew_point".to_string(), format!("{:.2}", stats.min)),
                    ("max_dew_point".to_string(), format!("{:.2}", stats.max)),
                ],
                warnings,
                computation_time_ms: computation_time,
            },
        })
    }

    fn get_config(&self) -> AnalyzerConfig {
        let mut params = HashMap::new();
        params.insert(
            "temperature_channel".to_string(),
            self.temperature_channel.clone(),
        );
        params.insert("humidity_channel".to_string(), self.humidity_channel.clone());
        params.insert(
            "condensation_warning_f".to_string(),
            self.condensation_warning_f.to_string(),
        );

        AnalyzerConfig {
            id: self.id().to_string(),
            name: self.name().to_string(),
            parameters: params,
        }
    }

    fn set_config(&mut self, config: &AnalyzerConfig) {
        if let Some(ch) = config.parameters.get("temperature_channel") {
            self.temperature_channel = ch.clone();
        }
        if let Some(ch) = config.parameters.get("humidity_channel") {
            self.humidity_channel = ch.clone();
        }
        super::apply_param(
            &config.parameters,
            "condensation_warning_f",
            &mut self.condensation_warning_f,
        );
    }

    fn clone_box(&self) -> Box<dyn Analyzer> {
        Box::new(self.clone())
    }
}
