//! Integration tests for end-to-end functionality
//!
//! Tests for:
//! - Log files through every session analysis
//! - Factor analysis on a synthetic two-zone building
//! - CSV and Parquet interchange

pub mod factor_tests;
pub mod interchange_tests;
pub mod pipeline_tests;
