//! Tests for unit handling and parameter selection
//!
//! Tests cover:
//! - Temperature unit serialization
//! - Reporting derived values in other units
//! - Parameter names and aliases

use crate::common::float_cmp::*;
use climalog::analysis::derived::dew_point_f;
use climalog::analysis::Parameter;
use climalog::parsers::types::{ChannelKind, DEW_POINT_F, RELATIVE_HUMIDITY_PCT, TEMPERATURE_F};
use climalog::units::{fahrenheit_to_celsius, TemperatureUnit};
use std::str::FromStr;

// ============================================
// Temperature Unit Tests
// ============================================

#[test]
fn test_temperature_unit_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&TemperatureUnit::Celsius).unwrap(),
        "\"celsius\""
    );
    let unit: TemperatureUnit = serde_json::from_str("\"kelvin\"").unwrap();
    assert_eq!(unit, TemperatureUnit::Kelvin);
}

#[test]
fn test_dew_point_reported_in_celsius() {
    let dp_f = dew_point_f(74.0, 50.0);
    let dp_c = TemperatureUnit::Celsius.convert_from_fahrenheit(dp_f);

    assert_approx_eq(dp_c, fahrenheit_to_celsius(dp_f), DEFAULT_TOLERANCE);
    assert_approx_eq(dp_c, 12.3, 0.1);
}

#[test]
fn test_limits_entered_in_celsius() {
    let unit = TemperatureUnit::Celsius;
    assert_approx_eq(unit.convert_to_fahrenheit(20.0), 68.0, DEFAULT_TOLERANCE);
    assert_approx_eq(TemperatureUnit::Kelvin.convert_to_fahrenheit(293.15), 68.0, DEFAULT_TOLERANCE);
    assert_approx_eq(unit.convert_delta_to_fahrenheit(5.0), 9.0, DEFAULT_TOLERANCE);
    assert_approx_eq(
        unit.convert_from_fahrenheit(unit.convert_to_fahrenheit(17.5)),
        17.5,
        DEFAULT_TOLERANCE,
    );
}

#[test]
fn test_swing_delta_in_kelvin_matches_celsius() {
    let f_swing = 18.0;
    assert_approx_eq(
        TemperatureUnit::Kelvin.convert_delta_from_fahrenheit(f_swing),
        TemperatureUnit::Celsius.convert_delta_from_fahrenheit(f_swing),
        DEFAULT_TOLERANCE,
    );
    assert_approx_eq(
        TemperatureUnit::Celsius.convert_delta_from_fahrenheit(f_swing),
        10.0,
        DEFAULT_TOLERANCE,
    );
}

// ============================================
// Parameter Tests
// ============================================

#[test]
fn test_parameter_aliases() {
    assert_eq!(Parameter::from_str("temp").unwrap(), Parameter::Temperature);
    assert_eq!(Parameter::from_str("RH").unwrap(), Parameter::RelativeHumidity);
    assert_eq!(Parameter::from_str("Dew_Point").unwrap(), Parameter::DewPoint);
    assert!(Parameter::from_str("pressure").is_err());
}

#[test]
fn test_parameter_channels_and_units() {
    assert_eq!(Parameter::Temperature.channel(), TEMPERATURE_F);
    assert_eq!(Parameter::RelativeHumidity.channel(), RELATIVE_HUMIDITY_PCT);
    assert_eq!(Parameter::DewPoint.channel(), DEW_POINT_F);

    assert_eq!(Parameter::RelativeHumidity.unit(), "%");
    assert_eq!(Parameter::DewPoint.unit(), "°F");
    assert_eq!(Parameter::DewPoint.kind(), ChannelKind::DewPoint);
}
