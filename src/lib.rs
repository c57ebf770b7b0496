//! climalog - time-series analysis for building climate sensor logs
//!
//! This library parses temperature/humidity logger exports, derives dew
//! point, and runs comfort and multi-room statistical analyses over them.
//!
//! ## Module Structure
//!
//! - [`parsers`] - Sensor log parsers and the shared time-series table
//! - [`analysis`] - Bounds, swing, resampling, correlation, suitability and
//!   factor analysis algorithms
//! - [`dataset`] - Multi-room datasets and CSV/Parquet interchange
//! - [`session`] - Analysis context holding a loaded dataset and settings
//! - [`settings`] - Analysis settings persistence
//! - [`severity`] - Room severity codes for floorplan colouring
//! - [`units`] - Temperature unit conversion utilities

pub mod analysis;
pub mod dataset;
pub mod parsers;
pub mod session;
pub mod settings;
pub mod severity;
pub mod units;
