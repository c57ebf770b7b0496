//! Factor-analysis suitability tests.
//!
//! Both tests are advisory: they classify a dataset but never prevent
//! factor extraction.

use super::statistics::{complete_columns, correlate, CorrelationMatrix};
use super::*;
use nalgebra::DMatrix;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Bartlett's test of sphericity
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BartlettResult {
    pub chi_square: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// Kaiser-Meyer-Olkin measure of sampling adequacy
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KmoResult {
    pub per_variable: Vec<(String, f64)>,
    pub overall: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suitability {
    Suitable,
    Unsuitable,
}

impl Suitability {
    fn from_flag(ok: bool) -> Self {
        if ok {
            Suitability::Suitable
        } else {
            Suitability::Unsuitable
        }
    }
}

/// Both tests with their classifications
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuitabilityReport {
    pub bartlett: BartlettResult,
    pub bartlett_suitability: Suitability,
    pub kmo: KmoResult,
    pub kmo_suitability: Suitability,
}

impl SuitabilityReport {
    pub fn is_suitable(&self) -> bool {
        self.bartlett_suitability == Suitability::Suitable
            && self.kmo_suitability == Suitability::Suitable
    }
}

fn require_variables(p: usize) -> Result<(), AnalysisError> {
    if p < 2 {
        return Err(AnalysisError::InsufficientData { needed: 2, got: p });
    }
    Ok(())
}

/// Inverse of a correlation matrix, falling back to the pseudo-inverse
/// for singular input
pub(crate) fn inverse_correlation(r: &DMatrix<f64>) -> Result<DMatrix<f64>, AnalysisError> {
    if let Some(inv) = r.clone().try_inverse() {
        return Ok(inv);
    }
    tracing::warn!("Correlation matrix is singular; using the pseudo-inverse");
    r.clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| AnalysisError::Computation(e.to_string()))
}

/// Bartlett's sphericity test over all columns of an aligned table.
///
/// `chi2 = -(n - 1 - (2p + 5) / 6) * ln|R|` with `p(p - 1) / 2` degrees of
/// freedom.
pub fn bartlett_sphericity(table: &TimeSeriesTable) -> Result<BartlettResult, AnalysisError> {
    let n = complete_columns(table, 3)?.first().map_or(0, Vec::len);
    let matrix = correlate(table)?;
    bartlett_from_matrix(&matrix, n)
}

pub fn bartlett_from_matrix(
    matrix: &CorrelationMatrix,
    n: usize,
) -> Result<BartlettResult, AnalysisError> {
    let p = matrix.len();
    require_variables(p)?;

    let det = matrix.to_dmatrix().determinant();
    if det.is_nan() {
        return Err(AnalysisError::Computation(
            "correlation matrix determinant is undefined".to_string(),
        ));
    }
    let dof = p * (p - 1) / 2;

    // ln|R| is -inf for linearly dependent variables
    if det <= 0.0 {
        tracing::warn!(
            "Correlation matrix determinant is {:e}; reporting infinite Bartlett chi-square",
            det
        );
        return Ok(BartlettResult {
            chi_square: f64::INFINITY,
            p_value: 0.0,
            degrees_of_freedom: dof,
        });
    }

    let n = n as f64;
    let p_f = p as f64;
    let chi_square = -(n - 1.0 - (2.0 * p_f + 5.0) / 6.0) * det.ln();

    let distribution = ChiSquared::new(dof as f64)
        .map_err(|e| AnalysisError::Computation(format!("chi-squared distribution: {e}")))?;
    let p_value = distribution.sf(chi_square);

    Ok(BartlettResult {
        chi_square,
        p_value,
        degrees_of_freedom: dof,
    })
}

/// KMO statistic from partial correlations derived from the inverse
/// correlation matrix
pub fn kmo(table: &TimeSeriesTable) -> Result<KmoResult, AnalysisError> {
    let matrix = correlate(table)?;
    kmo_from_matrix(&matrix)
}

pub fn kmo_from_matrix(matrix: &CorrelationMatrix) -> Result<KmoResult, AnalysisError> {
    let p = matrix.len();
    require_variables(p)?;

    let r = matrix.to_dmatrix();
    let inv = inverse_correlation(&r)?;

    let mut corr_sq = vec![0.0; p];
    let mut partial_sq = vec![0.0; p];
    for j in 0..p {
        for i in 0..p {
            if i == j {
                continue;
            }
            let scale = (inv[(i, i)] * inv[(j, j)]).sqrt();
            let partial = if scale > 0.0 { -inv[(i, j)] / scale } else { 0.0 };
            corr_sq[j] += r[(i, j)].powi(2);
            partial_sq[j] += partial.powi(2);
        }
    }

    let ratio = |c: f64, pc: f64| if c + pc > 0.0 { c / (c + pc) } else { 0.0 };
    let per_variable = matrix
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| (name.clone(), ratio(corr_sq[j], partial_sq[j])))
        .collect();
    let overall = ratio(corr_sq.iter().sum(), partial_sq.iter().sum());

    Ok(KmoResult {
        per_variable,
        overall,
    })
}

/// Run both tests and classify: Bartlett passes when `p <= alpha`, KMO when
/// `overall >= kmo_min`.
pub fn assess(
    table: &TimeSeriesTable,
    alpha: f64,
    kmo_min: f64,
) -> Result<SuitabilityReport, AnalysisError> {
    let n = complete_columns(table, 3)?.first().map_or(0, Vec::len);
    let matrix = correlate(table)?;

    let bartlett = bartlett_from_matrix(&matrix, n)?;
    let kmo = kmo_from_matrix(&matrix)?;

    let report = SuitabilityReport {
        bartlett_suitability: Suitability::from_flag(bartlett.p_value <= alpha),
        kmo_suitability: Suitability::from_flag(kmo.overall >= kmo_min),
        bartlett,
        kmo,
    };

    if !report.is_suitable() {
        tracing::warn!(
            "Dataset may be unsuitable for factor analysis (Bartlett p={:.4}, KMO={:.3})",
            report.bartlett.p_value,
            report.kmo.overall
        );
    }
    Ok(report)
}
