//! Temperature units and conversion utilities.
//!
//! Sensor logs record temperatures in Fahrenheit; analyses run in
//! Fahrenheit and results may be reported in another unit.

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Temperature unit preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[strum(serialize = "kelvin", serialize = "k")]
    Kelvin,
    #[strum(serialize = "celsius", serialize = "c")]
    Celsius,
    #[default]
    #[strum(serialize = "fahrenheit", serialize = "f")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Kelvin => "K",
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Convert from Fahrenheit to the selected unit
    pub fn convert_from_fahrenheit(&self, fahrenheit: f64) -> f64 {
        match self {
            TemperatureUnit::Kelvin => fahrenheit_to_celsius(fahrenheit) + 273.15,
            TemperatureUnit::Celsius => fahrenheit_to_celsius(fahrenheit),
            TemperatureUnit::Fahrenheit => fahrenheit,
        }
    }

    /// Convert a temperature in the selected unit to Fahrenheit
    pub fn convert_to_fahrenheit(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Kelvin => celsius_to_fahrenheit(value - 273.15),
            TemperatureUnit::Celsius => celsius_to_fahrenheit(value),
            TemperatureUnit::Fahrenheit => value,
        }
    }

    pub fn convert_delta_to_fahrenheit(&self, delta: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => delta,
            TemperatureUnit::Celsius | TemperatureUnit::Kelvin => delta * 9.0 / 5.0,
        }
    }

    /// Convert a temperature difference (e.g. a swing) from Fahrenheit degrees
    pub fn convert_delta_from_fahrenheit(&self, delta: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => delta,
            TemperatureUnit::Celsius | TemperatureUnit::Kelvin => delta * 5.0 / 9.0,
        }
    }
}

#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
