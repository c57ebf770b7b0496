//! Core module tests for non-parser functionality
//!
//! Tests for:
//! - Settings persistence
//! - Unit conversions
//! - Severity codes

pub mod settings_tests;
pub mod units_tests;
