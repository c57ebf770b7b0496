//! Tests for analysis settings persistence
//!
//! Tests cover:
//! - Default settings values
//! - Serialization/deserialization
//! - Save/load roundtrip
//! - Fallback on missing or invalid files

use climalog::analysis::bounds::CategoryPrecedence;
use climalog::analysis::swing::SwingTailPolicy;
use climalog::analysis::Parameter;
use climalog::settings::{AnalysisSettings, Bounds};
use climalog::units::TemperatureUnit;

// ============================================
// Default Settings Tests
// ============================================

#[test]
fn test_settings_default_version() {
    assert_eq!(AnalysisSettings::default().version, 1);
}

#[test]
fn test_settings_default_thresholds() {
    let settings = AnalysisSettings::default();

    assert_eq!(settings.swing_threshold, 10.0);
    assert_eq!(settings.swing_tail_policy, SwingTailPolicy::ZeroFill);
    assert_eq!(settings.category_precedence, CategoryPrecedence::BothFirst);
    assert_eq!(settings.bartlett_alpha, 0.05);
    assert_eq!(settings.kmo_minimum, 0.6);
    assert_eq!(settings.temperature_unit, TemperatureUnit::Fahrenheit);
}

#[test]
fn test_settings_default_bounds_per_parameter() {
    let settings = AnalysisSettings::default();

    assert_eq!(settings.bounds_for(Parameter::Temperature), Bounds::new(63.0, 74.0));
    assert_eq!(settings.bounds_for(Parameter::RelativeHumidity), Bounds::new(35.0, 57.0));
    assert_eq!(settings.bounds_for(Parameter::DewPoint), Bounds::new(37.0, 56.0));
}

// ============================================
// Serialization Tests
// ============================================

#[test]
fn test_settings_serialize_field_names() {
    let json = serde_json::to_string(&AnalysisSettings::default()).unwrap();

    assert!(json.contains("\"version\":1"));
    assert!(json.contains("\"swing_tail_policy\":\"zero_fill\""));
    assert!(json.contains("\"temperature_unit\":\"fahrenheit\""));
}

#[test]
fn test_settings_deserialize_empty_object() {
    let settings: AnalysisSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, AnalysisSettings::default());
}

#[test]
fn test_settings_deserialize_overrides() {
    let json = r#"{
        "version": 1,
        "sample_period_minutes": 10,
        "temperature_bounds": { "lower": 60.0, "upper": 75.0 },
        "category_precedence": "over_first",
        "temperature_unit": "celsius"
    }"#;
    let settings: AnalysisSettings = serde_json::from_str(json).unwrap();

    assert_eq!(settings.sample_period_minutes, 10);
    assert_eq!(settings.bounds_for(Parameter::Temperature), Bounds::new(60.0, 75.0));
    assert_eq!(settings.bounds_for(Parameter::RelativeHumidity), Bounds::new(35.0, 57.0));
    assert_eq!(settings.category_precedence, CategoryPrecedence::OverFirst);
    assert_eq!(settings.temperature_unit, TemperatureUnit::Celsius);
}

// ============================================
// Persistence Tests
// ============================================

#[test]
fn test_settings_save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let settings = AnalysisSettings {
        swing_threshold: 8.0,
        swing_tail_policy: SwingTailPolicy::Truncate,
        loading_threshold: 0.4,
        ..AnalysisSettings::default()
    };
    settings.save_to(&path).unwrap();

    assert_eq!(AnalysisSettings::load_from(&path), settings);
}

#[test]
fn test_settings_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = AnalysisSettings::load_from(&dir.path().join("absent.json"));
    assert_eq!(loaded, AnalysisSettings::default());
}

#[test]
fn test_settings_invalid_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert_eq!(AnalysisSettings::load_from(&path), AnalysisSettings::default());
}

#[test]
fn test_settings_path_ends_with_app_dir() {
    if let Some(path) = AnalysisSettings::get_settings_path() {
        assert!(path.ends_with("climalog/settings.json"));
    }
}
