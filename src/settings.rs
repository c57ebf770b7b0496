//! Analysis settings persistence.
//!
//! Defaults for bounds, swing and factor-analysis thresholds, stored as JSON
//! in the platform config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::bounds::CategoryPrecedence;
use crate::analysis::factor::DEFAULT_LOADING_THRESHOLD;
use crate::analysis::swing::SwingTailPolicy;
use crate::analysis::Parameter;
use crate::units::TemperatureUnit;

/// Inclusive lower/upper limits for one parameter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }
}

/// Settings that persist across sessions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Settings file version for migration support
    #[serde(default = "default_version")]
    pub version: u32,
    /// Grid used for resampling and the 24-hour swing window
    pub sample_period_minutes: u32,
    pub swing_tail_policy: SwingTailPolicy,
    pub swing_threshold: f64,
    pub temperature_bounds: Bounds,
    pub humidity_bounds: Bounds,
    pub dew_point_bounds: Bounds,
    pub category_precedence: CategoryPrecedence,
    /// Minimum |loading| for a variable to be listed under a factor
    pub loading_threshold: f64,
    /// Bartlett's test passes when p <= alpha
    pub bartlett_alpha: f64,
    pub kmo_minimum: f64,
    /// Unit used when reporting temperatures
    pub temperature_unit: TemperatureUnit,
}

fn default_version() -> u32 {
    1
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            version: 1,
            sample_period_minutes: 15,
            swing_tail_policy: SwingTailPolicy::ZeroFill,
            swing_threshold: 10.0,
            temperature_bounds: Bounds::new(63.0, 74.0),
            humidity_bounds: Bounds::new(35.0, 57.0),
            dew_point_bounds: Bounds::new(37.0, 56.0),
            category_precedence: CategoryPrecedence::BothFirst,
            loading_threshold: DEFAULT_LOADING_THRESHOLD,
            bartlett_alpha: 0.05,
            kmo_minimum: 0.6,
            temperature_unit: TemperatureUnit::Fahrenheit,
        }
    }
}

impl AnalysisSettings {
    /// Default bounds for a parameter
    pub fn bounds_for(&self, parameter: Parameter) -> Bounds {
        match parameter {
            Parameter::Temperature => self.temperature_bounds,
            Parameter::RelativeHumidity => self.humidity_bounds,
            Parameter::DewPoint => self.dew_point_bounds,
        }
    }

    /// Get the config directory path for climalog
    pub fn get_config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::data_dir().map(|p| p.join("climalog"))
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs::config_dir().map(|p| p.join("climalog"))
        }
    }

    /// Get the path to the settings JSON file
    pub fn get_settings_path() -> Option<PathBuf> {
        Self::get_config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the config directory
    pub fn load() -> Self {
        match Self::get_settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), String> {
        let path = Self::get_settings_path()
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }
}
