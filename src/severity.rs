//! Room severity codes for floorplan colouring.
//!
//! Bounds and swing codes are category constants in `[0, 1]`. Correlation
//! and factor maps carry the signed coefficient itself, so their codes span
//! `[-1, 1]`. The renderer owns the colour map.

use serde::Serialize;

use crate::analysis::bounds::{BoundsCategory, BoundsResult};
use crate::analysis::factor::FactorModel;
use crate::analysis::statistics::CorrelationMatrix;
use crate::analysis::swing::SwingSummary;
use crate::analysis::AnalysisError;
use crate::dataset::room_of;
use crate::parsers::types::ChannelKind;

pub const CODE_BOTH_VIOLATING: f64 = 0.5;
pub const CODE_OVER_ONLY: f64 = 0.2;
pub const CODE_UNDER_ONLY: f64 = 0.9;
pub const CODE_WITHIN_BOUNDS: f64 = 0.7;
pub const CODE_SWING_FAIL: f64 = 0.2;
pub const CODE_SWING_PASS: f64 = 0.7;

/// Value assigned to one room
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomCode {
    pub room: String,
    pub code: f64,
}

impl RoomCode {
    fn new(room: impl Into<String>, code: f64) -> Self {
        Self {
            room: room.into(),
            code,
        }
    }
}

pub fn bounds_code(category: BoundsCategory) -> f64 {
    match category {
        BoundsCategory::BothViolating => CODE_BOTH_VIOLATING,
        BoundsCategory::OverOnly => CODE_OVER_ONLY,
        BoundsCategory::UnderOnly => CODE_UNDER_ONLY,
        BoundsCategory::WithinBounds => CODE_WITHIN_BOUNDS,
    }
}

pub fn swing_code(summary: &SwingSummary) -> f64 {
    if summary.fails() {
        CODE_SWING_FAIL
    } else {
        CODE_SWING_PASS
    }
}

pub fn bounds_map(results: &[(String, BoundsResult)]) -> Vec<RoomCode> {
    results
        .iter()
        .map(|(room, result)| RoomCode::new(room.as_str(), bounds_code(result.category)))
        .collect()
}

pub fn swing_map(results: &[(String, SwingSummary)]) -> Vec<RoomCode> {
    results
        .iter()
        .map(|(room, summary)| RoomCode::new(room.as_str(), swing_code(summary)))
        .collect()
}

/// Correlation of every room against `column`, restricted to columns of
/// the same kind. Codes are the coefficients.
pub fn correlation_map(
    matrix: &CorrelationMatrix,
    column: &str,
) -> Result<Vec<RoomCode>, AnalysisError> {
    let kind = ChannelKind::from_column_name(column);
    let entries = matrix
        .column(column)
        .ok_or_else(|| AnalysisError::MissingChannel(column.to_string()))?;

    Ok(entries
        .into_iter()
        .filter(|(name, _)| ChannelKind::from_column_name(name) == kind)
        .map(|(name, r)| RoomCode::new(room_of(&name), r))
        .collect())
}

/// Loadings of the rooms that contribute to a 1-based factor
pub fn factor_map(model: &FactorModel, factor: usize) -> Result<Vec<RoomCode>, AnalysisError> {
    let contribution = model
        .contributions
        .iter()
        .find(|c| c.factor == factor)
        .ok_or_else(|| {
            AnalysisError::InvalidParameter(format!(
                "factor {factor} is outside 1..={}",
                model.factor_count()
            ))
        })?;

    Ok(contribution
        .variables
        .iter()
        .map(|(name, loading)| RoomCode::new(room_of(name), *loading))
        .collect())
}
